//! Per-call classification of a `(tool, args, session)` triple into
//! allow/deny/require-approval, plus the bounded audit ring buffer.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Capacity of the audit ring buffer. Oldest entries are evicted first.
pub const MAX_AUDIT: usize = 1000;

/// Tool name substrings that are auto-allowed without running any other
/// heuristic: read-only by name alone.
const READ_ONLY_HINTS: &[&str] = &["read", "list", "ls", "search", "grep", "glob", "view"];

/// Tool name substrings that require approval, absent a more specific rule.
const WRITE_LIKE_HINTS: &[&str] = &["write", "edit", "delete", "remove", "create"];

/// Default substrings in a shell command that force `require_approval` even
/// though the command isn't in the safe read-only set.
const DEFAULT_SHELL_CONFIRM_LIST: &[&str] = &[
    "rm", "mv", "sudo", "su", "dd", "reboot", "shutdown", "mkfs", "chmod", "chown", ">", ">>", "|",
];

/// Fixed allowlist of read-only shell commands, each restricted to simple
/// `-flag` arguments. Deliberately rejects any shell metacharacter.
static SAFE_SHELL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let commands = [
        "get-date", "date", "timedatectl", "whoami", "hostname", "uname", "uptime", "pwd",
    ];
    commands
        .iter()
        .map(|cmd| {
            Regex::new(&format!(r"^{}(\s+-[A-Za-z0-9%:_+/-]+)*\s*$", regex::escape(cmd))).unwrap()
        })
        .collect()
});

/// Metacharacters that disqualify a command from the safe read-only set
/// regardless of which word it starts with.
const SHELL_METACHARACTERS: &[&str] = &[";", "&&", "&", "||", "`", "$(", ">", "<<"];

/// A user-supplied override rule, evaluated in order before the built-in
/// heuristics.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// `*` (all), `prefix*` (starts-with), or an exact tool name.
    pub tool_pattern: String,
    pub decision: PolicyDecision,
    pub reason: Option<String>,
}

impl PolicyRule {
    fn matches(&self, tool_name: &str) -> bool {
        if self.tool_pattern == "*" {
            true
        } else if let Some(prefix) = self.tool_pattern.strip_suffix('*') {
            tool_name.starts_with(prefix)
        } else {
            self.tool_pattern == tool_name
        }
    }
}

/// The evaluation output: always one of these three, never a thrown error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
    RequireApproval { prompt: String },
}

/// The per-session view the policy engine consults: explicit allow/deny
/// lists layered on top of the global rules and heuristics.
#[derive(Debug, Clone, Default)]
pub struct PolicySession {
    pub user_id: String,
    pub chat_id: String,
    pub allowed_tools: Option<HashSet<String>>,
    pub denied_tools: HashSet<String>,
}

/// One row of the audit ring buffer.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: std::time::SystemTime,
    pub user_id: String,
    pub chat_id: String,
    pub tool: String,
    pub args_snapshot: Value,
    pub decision: PolicyDecision,
}

/// Evaluates tool calls against the decision ladder and accumulates audit
/// entries. Rules and the shell confirm list are set at construction and
/// treated as immutable thereafter; only the audit log is mutated at
/// runtime, under a mutex.
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
    shell_confirm_list: Vec<String>,
    audit_log: Mutex<VecDeque<AuditEntry>>,
}

impl PolicyEngine {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        PolicyEngine {
            rules,
            shell_confirm_list: DEFAULT_SHELL_CONFIRM_LIST.iter().map(|s| s.to_string()).collect(),
            audit_log: Mutex::new(VecDeque::with_capacity(MAX_AUDIT)),
        }
    }

    pub fn with_shell_confirm_list(mut self, list: Vec<String>) -> Self {
        self.shell_confirm_list = list;
        self
    }

    /// Classify one `(tool, args, session)` triple. Total: never panics,
    /// never returns anything but one of the three `PolicyDecision` variants.
    pub fn evaluate(&self, tool_name: &str, args: &Value, session: &PolicySession) -> PolicyDecision {
        let decision = self.decide(tool_name, args, session);
        self.log_audit(AuditEntry {
            timestamp: std::time::SystemTime::now(),
            user_id: session.user_id.clone(),
            chat_id: session.chat_id.clone(),
            tool: tool_name.to_string(),
            args_snapshot: args.clone(),
            decision: decision.clone(),
        });
        decision
    }

    fn decide(&self, tool_name: &str, args: &Value, session: &PolicySession) -> PolicyDecision {
        if session.denied_tools.contains(tool_name) {
            return PolicyDecision::Deny {
                reason: "denied for this user".to_string(),
            };
        }
        if let Some(allowed) = &session.allowed_tools {
            if !allowed.contains(tool_name) {
                return PolicyDecision::Deny {
                    reason: "not in allowed list".to_string(),
                };
            }
        }

        for rule in &self.rules {
            if rule.matches(tool_name) {
                return rule.decision.clone();
            }
        }

        let lower = tool_name.to_lowercase();
        if READ_ONLY_HINTS.iter().any(|hint| lower.contains(hint)) {
            return PolicyDecision::Allow;
        }

        if lower == "bash" || lower == "shell" {
            if let Some(command) = args.get("command").and_then(Value::as_str) {
                if self.is_safe_shell_command(command) {
                    return PolicyDecision::Allow;
                }
                if self.shell_confirm_list.iter().any(|s| command.contains(s.as_str())) {
                    return PolicyDecision::RequireApproval {
                        prompt: format!("Permission Request: run shell command `{}`?", command),
                    };
                }
            }
            return PolicyDecision::Allow;
        }

        if WRITE_LIKE_HINTS.iter().any(|hint| lower.contains(hint)) {
            let path = args
                .get("path")
                .or_else(|| args.get("file"))
                .and_then(Value::as_str)
                .unwrap_or("<unknown>");
            return PolicyDecision::RequireApproval {
                prompt: format!("Permission Request: {} on `{}`?", tool_name, path),
            };
        }

        PolicyDecision::RequireApproval {
            prompt: format!(
                "Permission Request: run `{}` with args {}?",
                tool_name,
                truncate(&args.to_string(), 100)
            ),
        }
    }

    fn is_safe_shell_command(&self, command: &str) -> bool {
        let trimmed = command.trim();
        if SHELL_METACHARACTERS.iter().any(|m| trimmed.contains(m)) {
            return false;
        }
        SAFE_SHELL_PATTERNS.iter().any(|re| re.is_match(trimmed))
    }

    fn log_audit(&self, entry: AuditEntry) {
        log::info!(
            "policy audit: user={} chat={} tool={} decision={:?}",
            entry.user_id,
            entry.chat_id,
            entry.tool,
            entry.decision
        );
        let mut log = self.audit_log.lock().expect("audit log mutex poisoned");
        if log.len() >= MAX_AUDIT {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// A snapshot of the current audit log, oldest first.
    pub fn audit_snapshot(&self) -> Vec<AuditEntry> {
        self.audit_log.lock().expect("audit log mutex poisoned").iter().cloned().collect()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> PolicySession {
        PolicySession {
            user_id: "u1".into(),
            chat_id: "c1".into(),
            allowed_tools: None,
            denied_tools: HashSet::new(),
        }
    }

    #[test]
    fn denied_tools_wins_over_everything_else() {
        let engine = PolicyEngine::new(vec![PolicyRule {
            tool_pattern: "*".into(),
            decision: PolicyDecision::Allow,
            reason: None,
        }]);
        let mut sess = session();
        sess.denied_tools.insert("bash".into());
        let decision = engine.evaluate("bash", &json!({}), &sess);
        assert_eq!(
            decision,
            PolicyDecision::Deny {
                reason: "denied for this user".into()
            }
        );
    }

    #[test]
    fn read_only_hint_is_auto_allowed() {
        let engine = PolicyEngine::new(vec![]);
        let decision = engine.evaluate("read_file", &json!({"path": "a.txt"}), &session());
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn safe_shell_pattern_bypasses_approval() {
        let engine = PolicyEngine::new(vec![]);
        let decision = engine.evaluate("bash", &json!({"command": "date '+%Y-%m-%d'"}), &session());
        assert_eq!(decision, PolicyDecision::Allow);
    }

    #[test]
    fn shell_confirm_list_requires_approval() {
        let engine = PolicyEngine::new(vec![]);
        let decision = engine.evaluate("bash", &json!({"command": "rm -rf tmp"}), &session());
        match decision {
            PolicyDecision::RequireApproval { prompt } => {
                assert!(prompt.contains("rm -rf tmp"));
            }
            other => panic!("expected require_approval, got {:?}", other),
        }
    }

    #[test]
    fn write_like_tool_requires_approval() {
        let engine = PolicyEngine::new(vec![]);
        let decision = engine.evaluate("write_file", &json!({"path": "a.txt"}), &session());
        assert!(matches!(decision, PolicyDecision::RequireApproval { .. }));
    }

    #[test]
    fn unmatched_tool_defaults_to_require_approval() {
        let engine = PolicyEngine::new(vec![]);
        let decision = engine.evaluate("mystery_tool", &json!({"x": 1}), &session());
        assert!(matches!(decision, PolicyDecision::RequireApproval { .. }));
    }

    #[test]
    fn audit_log_is_bounded_and_fifo() {
        let engine = PolicyEngine::new(vec![]);
        for i in 0..(MAX_AUDIT + 10) {
            engine.evaluate("read_file", &json!({"i": i}), &session());
        }
        let snapshot = engine.audit_snapshot();
        assert_eq!(snapshot.len(), MAX_AUDIT);
        assert_eq!(snapshot.first().unwrap().args_snapshot["i"], 10);
    }

    #[test]
    fn user_rule_overrides_builtin_heuristics() {
        let engine = PolicyEngine::new(vec![PolicyRule {
            tool_pattern: "read_*".into(),
            decision: PolicyDecision::Deny {
                reason: "operator disabled reads".into(),
            },
            reason: None,
        }]);
        let decision = engine.evaluate("read_file", &json!({}), &session());
        assert_eq!(
            decision,
            PolicyDecision::Deny {
                reason: "operator disabled reads".into()
            }
        );
    }
}
