use std::{collections::HashMap, sync::Arc};

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::{dispatch::Plugin, Result};

/// How a rule is activated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Only when the message is addressed to the bot; matched against the body with the
    /// mention stripped. First matching rule wins.
    Mention,
    /// On every message, matched against the full text. Every matching rule fires.
    Listen,
}

/// One row of a plugin's rule table.
#[derive(Clone, Debug)]
pub struct RuleSpec {
    pub action: &'static str,
    pub pattern: String,
    pub mode: Mode,
    /// Named groups that must have participated in the match.
    pub required: &'static [&'static str],
    pub help: &'static str,
    pub case_sensitive: bool,
}

impl RuleSpec {
    pub fn mention(action: &'static str, pattern: impl Into<String>) -> Self {
        Self::new(action, pattern, Mode::Mention)
    }

    pub fn listen(action: &'static str, pattern: impl Into<String>) -> Self {
        Self::new(action, pattern, Mode::Listen)
    }

    fn new(action: &'static str, pattern: impl Into<String>, mode: Mode) -> Self {
        Self {
            action,
            pattern: pattern.into(),
            mode,
            required: &[],
            help: "",
            case_sensitive: false,
        }
    }

    pub fn requires(mut self, groups: &'static [&'static str]) -> Self {
        self.required = groups;
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// Named capture groups of a match, owned so handlers can hold them across awaits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captures {
    groups: HashMap<String, String>,
}

impl Captures {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Build directly from pairs (handy in tests).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            groups: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

pub(crate) struct Rule {
    pub(crate) plugin: Arc<dyn Plugin>,
    pub(crate) action: &'static str,
    pub(crate) mode: Mode,
    regex: Regex,
    required: &'static [&'static str],
    pub(crate) help: &'static str,
}

impl Rule {
    fn matches(&self, text: &str) -> Option<Captures> {
        let caps = self.regex.captures(text)?;
        let groups: HashMap<String, String> = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();

        if self.required.iter().any(|g| !groups.contains_key(*g)) {
            return None;
        }
        Some(Captures { groups })
    }

    pub(crate) fn label(&self) -> String {
        format!("{}.{}", self.plugin.name(), self.action)
    }
}

/// Ordered set of compiled rules. Registration order is the only tie-breaker.
#[derive(Default)]
pub struct Registry {
    rules: Vec<Rule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append every rule in the plugin's table.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        for spec in plugin.rules() {
            self.register_rule(plugin.clone(), spec)?;
        }
        Ok(())
    }

    pub fn register_rule(&mut self, plugin: Arc<dyn Plugin>, spec: RuleSpec) -> Result<()> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(!spec.case_sensitive)
            .build()?;
        debug!(
            plugin = plugin.name(),
            action = spec.action,
            mode = ?spec.mode,
            "registered rule"
        );
        self.rules.push(Rule {
            plugin,
            action: spec.action,
            mode: spec.mode,
            regex,
            required: spec.required,
            help: spec.help,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First mention rule matching `body`.
    pub(crate) fn mention_match(&self, body: &str) -> Option<(&Rule, Captures)> {
        self.rules
            .iter()
            .filter(|r| r.mode == Mode::Mention)
            .find_map(|r| r.matches(body).map(|c| (r, c)))
    }

    /// Every listen rule matching `text`, in registration order.
    pub(crate) fn listen_matches(&self, text: &str) -> Vec<(&Rule, Captures)> {
        self.rules
            .iter()
            .filter(|r| r.mode == Mode::Listen)
            .filter_map(|r| r.matches(text).map(|c| (r, c)))
            .collect()
    }

    /// Mention commands, then listeners, one line per rule with help text.
    pub fn help_text(&self) -> String {
        let section = |mode: Mode| -> String {
            self.rules
                .iter()
                .filter(|r| r.mode == mode && !r.help.is_empty())
                .map(|r| format!("  • {}: {}", r.label(), r.help))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "Respond to:\n{}\n\nListen to:\n{}",
            section(Mode::Mention),
            section(Mode::Listen)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::IncomingMessage, messaging::types::Reply};
    use async_trait::async_trait;

    struct Table(Vec<RuleSpec>);

    #[async_trait]
    impl Plugin for Table {
        fn name(&self) -> &'static str {
            "table"
        }

        fn rules(&self) -> Vec<RuleSpec> {
            self.0.clone()
        }

        async fn handle(
            &self,
            _action: &str,
            _msg: &IncomingMessage,
            _caps: &Captures,
        ) -> Result<Vec<Reply>> {
            Ok(vec![])
        }
    }

    fn registry(rules: Vec<RuleSpec>) -> Registry {
        let mut reg = Registry::new();
        reg.register(Arc::new(Table(rules))).unwrap();
        reg
    }

    #[test]
    fn first_mention_rule_wins() {
        let reg = registry(vec![
            RuleSpec::mention("first", r"^print\s(?P<key>\w+)$"),
            RuleSpec::mention("second", r"print"),
        ]);
        let (rule, caps) = reg.mention_match("PRINT beer").unwrap();
        assert_eq!(rule.action, "first");
        assert_eq!(caps.get("key"), Some("beer"));
    }

    #[test]
    fn all_listeners_fire_and_mentions_are_ignored() {
        let reg = registry(vec![
            RuleSpec::listen("a", "towel"),
            RuleSpec::mention("m", "towel"),
            RuleSpec::listen("b", "you're a towel"),
        ]);
        let hits: Vec<_> = reg
            .listen_matches("hey, you're a towel")
            .into_iter()
            .map(|(r, _)| r.action)
            .collect();
        assert_eq!(hits, vec!["a", "b"]);
    }

    #[test]
    fn missing_required_group_is_no_match() {
        let reg = registry(vec![RuleSpec::mention(
            "roll",
            r"^roll\sdice(\s(?P<dice>\d+d\d+))?$",
        )
        .requires(&["dice"])]);
        assert!(reg.mention_match("roll dice").is_none());
        assert!(reg.mention_match("roll dice 2d6").is_some());
    }

    #[test]
    fn case_sensitivity_is_opt_out() {
        let reg = registry(vec![RuleSpec::listen("caps", "[A-Z]{3}").case_sensitive()]);
        assert!(reg.listen_matches("no caps here").is_empty());
        assert_eq!(reg.listen_matches("WHY").len(), 1);
    }

    #[test]
    fn bad_pattern_is_rejected_at_registration() {
        let mut reg = Registry::new();
        let err = reg
            .register(Arc::new(Table(vec![RuleSpec::listen("bad", "(")])))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Pattern(_)));
    }

    #[test]
    fn help_lists_mentions_then_listeners() {
        let reg = registry(vec![
            RuleSpec::listen("l", "x").help("listens"),
            RuleSpec::mention("m", "y").help("responds"),
            RuleSpec::mention("quiet", "z"),
        ]);
        assert_eq!(
            reg.help_text(),
            "Respond to:\n  • table.m: responds\n\nListen to:\n  • table.l: listens"
        );
    }
}
