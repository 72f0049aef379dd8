//! In-memory channel used by unit tests.

use crate::channels::{ChannelHandle, ReplyTarget};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(String),
    File {
        caption: String,
        path: PathBuf,
        existed: bool,
    },
}

/// Records every send. Conversations listed in `failing` reject sends.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub sent: Mutex<Vec<(ReplyTarget, Sent)>>,
    pub failing: Vec<String>,
    pub fail_files: bool,
}

impl RecordingChannel {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, s)| match s {
                Sent::Text(t) => Some(t.clone()),
                Sent::File { .. } => None,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| matches!(s, Sent::File { .. }))
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelHandle for RecordingChannel {
    fn id(&self) -> &str {
        "test"
    }

    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<(), String> {
        if self.failing.contains(&target.conversation_id) {
            return Err(format!("missing access to {}", target.conversation_id));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), Sent::Text(text.to_string())));
        Ok(())
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        caption: &str,
        path: &Path,
        _file_name: &str,
    ) -> Result<(), String> {
        let existed = path.exists();
        self.sent.lock().unwrap().push((
            target.clone(),
            Sent::File {
                caption: caption.to_string(),
                path: path.to_path_buf(),
                existed,
            },
        ));
        if self.fail_files {
            return Err("request entity too large".to_string());
        }
        Ok(())
    }
}
