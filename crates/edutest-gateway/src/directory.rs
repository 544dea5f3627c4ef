//! Gateway serving tests from JSON files on disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use edutest_core::error::GatewayError;
use edutest_core::model::{AnswerKey, Test, TestId};
use edutest_core::parser;
use edutest_core::traits::TestGateway;

/// Serves every `*.json` test definition under a directory.
///
/// An answer key for test `N` is read from `N.key.json` next to the tests.
pub struct DirectoryGateway {
    root: PathBuf,
}

impl DirectoryGateway {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl TestGateway for DirectoryGateway {
    fn name(&self) -> &str {
        "directory"
    }

    async fn fetch_test(&self, id: TestId) -> anyhow::Result<Test> {
        let root = self.root.clone();
        let tests = tokio::task::spawn_blocking(move || parser::load_test_directory(&root))
            .await
            .context("directory scan panicked")??;

        tests
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| GatewayError::NotFound(id).into())
    }

    async fn fetch_answer_key(&self, id: TestId) -> anyhow::Result<Option<AnswerKey>> {
        let path = self.root.join(format!("{id}.key.json"));
        if !path.exists() {
            return Ok(None);
        }
        let key = tokio::task::spawn_blocking(move || parser::parse_answer_key(&path))
            .await
            .context("answer key read panicked")??;
        Ok(Some(key))
    }
}
