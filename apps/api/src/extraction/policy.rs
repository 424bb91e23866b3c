use serde::{Deserialize, Serialize};

/// Runtime policy deciding when the LLM is consulted.
///
/// Read from the settings store at the start of every extraction call;
/// never cached, since an operator may change it between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    /// When true, the LLM runs only if taxonomy matching found nothing.
    pub llm_fallback_only: bool,
}

impl ExtractionPolicy {
    pub fn should_call_llm(&self, taxonomy_match_count: usize) -> bool {
        !(self.llm_fallback_only && taxonomy_match_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_only_skips_llm_when_taxonomy_hits() {
        let policy = ExtractionPolicy {
            llm_fallback_only: true,
        };
        assert!(!policy.should_call_llm(1));
        assert!(!policy.should_call_llm(12));
    }

    #[test]
    fn test_fallback_only_calls_llm_when_taxonomy_empty() {
        let policy = ExtractionPolicy {
            llm_fallback_only: true,
        };
        assert!(policy.should_call_llm(0));
    }

    #[test]
    fn test_always_on_calls_llm_regardless() {
        let policy = ExtractionPolicy::default();
        assert!(policy.should_call_llm(0));
        assert!(policy.should_call_llm(5));
    }
}
