//! A narrow rule language for extracting domains out of fetched block-list
//! text (spec §6: "interpreted by the narrow `transform` mini-language, not
//! a full AWK engine"). `original_source/lists/lists.go` drives a real
//! embedded AWK interpreter (`goawk`) over each source's list-specific
//! `rule`; reimplementing an AWK engine is out of scope for a single
//! forwarder binary, so this module covers the shapes the catalogue in
//! `assets/sources.json` actually needs: skip-comment, column-select, and
//! strip-prefix.
//!
//! A rule is a short pipe-separated program, e.g. `skip:#|strip:0.0.0.0
//! |field:1`. Each stage consumes the line (or discards it) in order.

/// One stage of a transform rule.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    /// Drop the line if it starts with the given prefix (comment markers).
    SkipPrefix(String),
    /// Drop the line if it is empty once whitespace-trimmed.
    SkipBlank,
    /// Strip a leading literal prefix (e.g. a hosts-file `0.0.0.0 ` marker).
    StripPrefix(String),
    /// Keep only the given whitespace-separated column (0-indexed).
    Field(usize),
}

/// A compiled rule: an ordered pipeline of stages applied to every line of a
/// fetched source.
#[derive(Debug, Clone)]
pub struct Rule {
    stages: Vec<Stage>,
}

impl Rule {
    /// Parses a pipe-separated rule string. Unknown stage names are ignored
    /// rather than rejected, since the catalogue is static and trusted —
    /// the only realistic way one reaches production is a typo, which a
    /// no-op stage surfaces as "more domains than expected" rather than a
    /// startup crash.
    pub fn parse(spec: &str) -> Self {
        let stages = spec
            .split('|')
            .filter_map(|segment| {
                let segment = segment.trim();
                let (name, arg) = segment.split_once(':').unwrap_or((segment, ""));
                match name {
                    "skip" => Some(Stage::SkipPrefix(arg.to_string())),
                    "skip_blank" => Some(Stage::SkipBlank),
                    "strip" => Some(Stage::StripPrefix(arg.to_string())),
                    "field" => arg.parse().ok().map(Stage::Field),
                    _ => None,
                }
            })
            .collect();
        Self { stages }
    }

    /// The identity rule: keep every non-blank line verbatim. Used when a
    /// source's catalogue entry carries an empty `rule`.
    pub fn identity() -> Self {
        Self { stages: vec![Stage::SkipBlank] }
    }

    /// Applies every stage to `line`, returning `None` if any stage drops
    /// it.
    fn apply(&self, line: &str) -> Option<String> {
        let mut current = line.trim().to_string();
        for stage in &self.stages {
            match stage {
                Stage::SkipPrefix(prefix) => {
                    if !prefix.is_empty() && current.starts_with(prefix.as_str()) {
                        return None;
                    }
                }
                Stage::SkipBlank => {
                    if current.is_empty() {
                        return None;
                    }
                }
                Stage::StripPrefix(prefix) => {
                    if let Some(rest) = current.strip_prefix(prefix.as_str()) {
                        current = rest.trim().to_string();
                    }
                }
                Stage::Field(index) => {
                    current = current.split_whitespace().nth(*index)?.to_string();
                }
            }
        }
        if current.is_empty() {
            None
        } else {
            Some(current)
        }
    }

    /// Runs the rule over every line of `text`, returning the extracted
    /// domains in order.
    pub fn extract(&self, text: &str) -> Vec<String> {
        text.lines().filter_map(|line| self.apply(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_nonblank_lines() {
        let rule = Rule::identity();
        assert_eq!(rule.extract("ads.example\n\nbad.example\n"), vec!["ads.example", "bad.example"]);
    }

    #[test]
    fn skip_comment_lines() {
        let rule = Rule::parse("skip:#|skip_blank");
        let text = "# comment\nads.example\n\nbad.example\n";
        assert_eq!(rule.extract(text), vec!["ads.example", "bad.example"]);
    }

    #[test]
    fn strip_hosts_style_prefix() {
        // Hosts files conventionally map the sinkhole address to itself
        // (`0.0.0.0 0.0.0.0`); that residual literal must not survive as a
        // "domain" once the address prefix is stripped off.
        let rule = Rule::parse("strip:0.0.0.0 |skip:0.0.0.0|skip_blank");
        let text = "0.0.0.0 ads.example\n0.0.0.0 0.0.0.0\n";
        assert_eq!(rule.extract(text), vec!["ads.example"]);
    }

    #[test]
    fn field_selects_column() {
        let rule = Rule::parse("field:1|skip_blank");
        let text = "0.0.0.0 ads.example\n";
        assert_eq!(rule.extract(text), vec!["ads.example"]);
    }

    #[test]
    fn unknown_stage_is_skipped_not_rejected() {
        let rule = Rule::parse("bogus:whatever|skip_blank");
        assert_eq!(rule.extract("ads.example\n"), vec!["ads.example"]);
    }
}
