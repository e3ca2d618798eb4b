use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::network::{Checker, DEFAULT_MAX_SUGGESTIONS, Issue, IssueCategory, NetworkError};
use crate::utils::utf16_to_byte_offset;

pub const DEFAULT_ENDPOINT: &str = "https://api.languagetool.org/v2/check";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct LanguageToolConfig {
    pub endpoint: String,
    pub language: String,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub max_suggestions: usize,
}

impl Default for LanguageToolConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            username: None,
            api_key: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    matches: Vec<RuleMatch>,
}

#[derive(Debug, Deserialize)]
struct RuleMatch {
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
    #[serde(default)]
    rule: Rule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rule {
    #[serde(default)]
    issue_type: String,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

pub struct LanguageToolClient {
    http: Client,
    config: LanguageToolConfig,
}

impl LanguageToolClient {
    pub fn new(config: LanguageToolConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| NetworkError::ClientBuild(err.to_string()))?;

        Ok(Self { http, config })
    }

    fn form_fields<'a>(&'a self, text: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut fields = vec![("text", text), ("language", self.config.language.as_str())];
        // Premium accounts authenticate with both fields; either one alone is rejected.
        if let (Some(username), Some(api_key)) = (&self.config.username, &self.config.api_key) {
            fields.push(("username", username.as_str()));
            fields.push(("apiKey", api_key.as_str()));
        }
        fields
    }
}

#[async_trait]
impl Checker for LanguageToolClient {
    async fn check(&self, text: &str) -> Result<Vec<Issue>, NetworkError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let response = self
            .http
            .post(&self.config.endpoint)
            .form(&self.form_fields(text))
            .send()
            .await
            .map_err(|err| NetworkError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let payload = response
            .text()
            .await
            .map_err(|err| NetworkError::Request(err.to_string()))?;
        let issues = parse_check_response(text, &payload, self.config.max_suggestions)?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            issues = issues.len(),
            "analysis request completed"
        );
        Ok(issues)
    }
}

/// Decodes a `matches` payload into issues with byte offsets into `text`.
pub fn parse_check_response(
    text: &str,
    payload: &str,
    max_suggestions: usize,
) -> Result<Vec<Issue>, NetworkError> {
    let response = serde_json::from_str::<CheckResponse>(payload)
        .map_err(|err| NetworkError::Decode(err.to_string()))?;

    let mut issues = Vec::with_capacity(response.matches.len());
    for rule_match in response.matches {
        let Some(issue) = convert_match(text, rule_match, max_suggestions) else {
            continue;
        };
        issues.push(issue);
    }

    issues.sort_by_key(|issue| issue.offset);
    let mut accepted: Vec<Issue> = Vec::with_capacity(issues.len());
    for issue in issues {
        if let Some(previous) = accepted.last() {
            if issue.offset < previous.end() {
                warn!(
                    offset = issue.offset,
                    previous_end = previous.end(),
                    "dropping overlapping analysis match"
                );
                continue;
            }
        }
        accepted.push(issue);
    }

    Ok(accepted)
}

fn convert_match(text: &str, rule_match: RuleMatch, max_suggestions: usize) -> Option<Issue> {
    if rule_match.length == 0 {
        warn!(offset = rule_match.offset, "dropping zero-length analysis match");
        return None;
    }

    let Some(match_end) = rule_match.offset.checked_add(rule_match.length) else {
        warn!(
            offset = rule_match.offset,
            length = rule_match.length,
            "dropping analysis match with an overflowing range"
        );
        return None;
    };
    let start = utf16_to_byte_offset(text, rule_match.offset);
    let end = utf16_to_byte_offset(text, match_end);
    let (Some(start), Some(end)) = (start, end) else {
        warn!(
            offset = rule_match.offset,
            length = rule_match.length,
            "dropping analysis match outside of the checked text"
        );
        return None;
    };

    let suggestions = rule_match
        .replacements
        .into_iter()
        .take(max_suggestions)
        .map(|replacement| replacement.value)
        .collect();

    Some(Issue {
        offset: start,
        length: end - start,
        category: IssueCategory::from_issue_type(&rule_match.rule.issue_type),
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LanguageToolClient {
        LanguageToolClient::new(LanguageToolConfig {
            // Unroutable on purpose: any request made by a test fails loudly.
            endpoint: "http://127.0.0.1:9/v2/check".to_string(),
            ..LanguageToolConfig::default()
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn blank_text_short_circuits_without_request() {
        let client = client();
        assert!(client.check("").await.expect("no request").is_empty());
        assert!(client.check("  \n\t").await.expect("no request").is_empty());
    }

    #[test]
    fn form_fields_include_credentials_only_when_both_are_set() {
        let mut client = client();
        assert_eq!(
            client.form_fields("hi"),
            vec![("text", "hi"), ("language", "en-US")]
        );

        client.config.username = Some("me@example.com".to_string());
        assert_eq!(client.form_fields("hi").len(), 2);

        client.config.api_key = Some("secret".to_string());
        let fields = client.form_fields("hi");
        assert!(fields.contains(&("username", "me@example.com")));
        assert!(fields.contains(&("apiKey", "secret")));
    }

    #[test]
    fn parse_maps_categories_and_truncates_suggestions() {
        let text = "Ths is a tset of it's use.";
        let payload = r#"{"matches":[
            {"offset":9,"length":4,"rule":{"issueType":"misspelling"},
             "replacements":[{"value":"test"},{"value":"set"},{"value":"tent"},{"value":"text"}]},
            {"offset":0,"length":3,"rule":{"issueType":"misspelling"},"replacements":[{"value":"This"}]},
            {"offset":17,"length":4,"rule":{"issueType":"grammar"},"replacements":[]}
        ]}"#;

        let issues = parse_check_response(text, payload, 3).expect("payload should parse");

        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].offset, 0);
        assert_eq!(issues[0].category, IssueCategory::Spelling);
        assert_eq!(issues[1].suggestions, vec!["test", "set", "tent"]);
        assert_eq!(issues[2].category, IssueCategory::Grammar);
        assert!(issues[2].suggestions.is_empty());
        assert_eq!(&text[issues[2].offset..issues[2].end()], "it's");
    }

    #[test]
    fn parse_treats_unknown_issue_types_as_grammar() {
        let payload = r#"{"matches":[{"offset":0,"length":2,"rule":{"issueType":"typographical"},"replacements":[]}]}"#;
        let issues = parse_check_response("ab", payload, 3).expect("payload should parse");
        assert_eq!(issues[0].category, IssueCategory::Grammar);
    }

    #[test]
    fn parse_converts_utf16_offsets_to_bytes() {
        let text = "naïve 😀 speling";
        // "speling" starts at UTF-16 unit 9: n a ï v e ␠ 😀(2) ␠
        let payload = r#"{"matches":[{"offset":9,"length":7,"rule":{"issueType":"misspelling"},"replacements":[{"value":"spelling"}]}]}"#;

        let issues = parse_check_response(text, payload, 3).expect("payload should parse");

        assert_eq!(&text[issues[0].offset..issues[0].end()], "speling");
    }

    #[test]
    fn parse_drops_out_of_range_and_overlapping_matches() {
        let payload = r#"{"matches":[
            {"offset":0,"length":4,"rule":{"issueType":"grammar"},"replacements":[]},
            {"offset":2,"length":3,"rule":{"issueType":"grammar"},"replacements":[]},
            {"offset":40,"length":3,"rule":{"issueType":"grammar"},"replacements":[]},
            {"offset":6,"length":0,"rule":{"issueType":"grammar"},"replacements":[]}
        ]}"#;

        let issues = parse_check_response("abcdefgh", payload, 3).expect("payload should parse");

        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].offset, issues[0].length), (0, 4));
    }

    #[test]
    fn parse_drops_matches_whose_range_overflows() {
        let payload = r#"{"matches":[
            {"offset":18446744073709551615,"length":1,"rule":{"issueType":"grammar"},"replacements":[]},
            {"offset":1,"length":18446744073709551615,"rule":{"issueType":"grammar"},"replacements":[]},
            {"offset":0,"length":1,"rule":{"issueType":"misspelling"},"replacements":[{"value":"A"}]}
        ]}"#;

        let issues = parse_check_response("abc", payload, 3).expect("payload should parse");

        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].offset, issues[0].length), (0, 1));
    }

    #[test]
    fn parse_rejects_unexpected_shape() {
        let result = parse_check_response("abc", r#"{"status":"ok"}"#, 3);
        assert!(matches!(result, Err(NetworkError::Decode(_))));
    }
}
