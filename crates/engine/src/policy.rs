//! Summary policy: deciding whether a post-command reply already reads
//! like a complete answer or a final summary should be requested.

/// Pluggable completeness heuristic for streamed replies that follow at
/// least one executed command.
pub trait SummaryPolicy: Send + Sync {
    fn is_complete_answer(&self, reply: &str) -> bool;
}

/// The default heuristic: the reply is long enough and contains at
/// least one concluding keyword (English or Chinese).
pub struct KeywordSummaryPolicy {
    min_length: usize,
    keywords: Vec<&'static str>,
}

impl KeywordSummaryPolicy {
    pub fn new() -> Self {
        Self {
            min_length: 100,
            keywords: vec![
                "您的", "包含", "总结", "综上", "因此", "文件", "文件夹",
                "your", "contains", "summary", "conclusion", "files", "folders",
            ],
        }
    }
}

impl Default for KeywordSummaryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryPolicy for KeywordSummaryPolicy {
    fn is_complete_answer(&self, reply: &str) -> bool {
        reply.chars().count() > self.min_length
            && self.keywords.iter().any(|k| reply.contains(k))
    }
}

/// Always treats replies as complete; for callers that never want an
/// extra summary round trip.
pub struct NeverSummarize;

impl SummaryPolicy for NeverSummarize {
    fn is_complete_answer(&self, _reply: &str) -> bool {
        true
    }
}
