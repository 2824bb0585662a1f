use std::collections::{BTreeMap, BTreeSet};

use davdrop_config::ChannelMapping;

/// Static chat → directory mapping, read-only after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRoutes {
    by_chat: BTreeMap<i64, String>,
}

impl ChannelRoutes {
    /// Build from configured mappings. Later duplicates of a chat id win.
    #[must_use]
    pub fn new(mappings: &[ChannelMapping]) -> Self {
        let by_chat = mappings
            .iter()
            .map(|m| (m.chat_id, normalize_directory(&m.directory)))
            .collect();
        Self { by_chat }
    }

    #[must_use]
    pub fn directory_for(&self, chat_id: i64) -> Option<&str> {
        self.by_chat.get(&chat_id).map(String::as_str)
    }

    /// Distinct mapped directories, sorted.
    #[must_use]
    pub fn directories(&self) -> BTreeSet<String> {
        self.by_chat.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.by_chat.iter().map(|(id, dir)| (*id, dir.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_chat.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_chat.is_empty()
    }
}

/// `inbox/` → `/inbox`; the root stays `/`.
#[must_use]
pub fn normalize_directory(directory: &str) -> String {
    let trimmed = directory.trim().trim_matches('/');
    format!("/{trimmed}")
}

/// Remote path of `file_name` inside `directory`.
#[must_use]
pub fn remote_path(directory: &str, file_name: &str) -> String {
    format!("{}/{file_name}", directory.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn mapping(chat_id: i64, directory: &str) -> ChannelMapping {
        ChannelMapping {
            chat_id,
            directory: directory.into(),
        }
    }

    #[test]
    fn looks_up_normalized_directories() {
        let routes = ChannelRoutes::new(&[
            mapping(-100, "/inbox"),
            mapping(-200, "photos/"),
            mapping(-300, "/inbox"),
        ]);

        assert_eq!(routes.directory_for(-100), Some("/inbox"));
        assert_eq!(routes.directory_for(-200), Some("/photos"));
        assert_eq!(routes.directory_for(555), None);
        assert_eq!(
            routes.directories().into_iter().collect::<Vec<_>>(),
            vec!["/inbox".to_string(), "/photos".to_string()]
        );
        assert_eq!(routes.iter().count(), 3);
    }

    #[rstest]
    #[case("/archive", "report.pdf", "/archive/report.pdf")]
    #[case("/archive/", "report.pdf", "/archive/report.pdf")]
    #[case("/", "report.pdf", "/report.pdf")]
    fn joins_remote_paths(#[case] dir: &str, #[case] file: &str, #[case] expected: &str) {
        assert_eq!(remote_path(dir, file), expected);
    }
}
