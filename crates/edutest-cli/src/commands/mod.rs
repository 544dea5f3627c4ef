pub mod grade;
pub mod init;
pub mod report;
pub mod take;
pub mod validate;
