use std::collections::HashMap;

use crate::error::DigestError;
use crate::llm::{CompletionProvider, LlmRequest};
use crate::news::Article;

/// Key terms pulled from one article, with their translations.
///
/// Invariant: `keywords` is never empty; an extraction that yields no
/// keywords fails instead of producing an empty digest. A keyword may
/// have no translation, which the formatter tolerates.
#[derive(Debug, Clone)]
pub struct Digest {
    pub keywords: Vec<String>,
    pub translations: HashMap<String, String>,
    /// Free-text summary, reserved for a future message layout.
    pub summary: String,
}

impl Digest {
    pub fn translation(&self, keyword: &str) -> Option<&str> {
        self.translations.get(keyword).map(String::as_str)
    }
}

/// Instructs the model to answer in exactly the two lines the parser
/// understands. Anything else in the response is ignored.
fn build_prompt(article: &Article) -> String {
    format!(
        r#"Analyze this technology article and extract:

1. 5 key technical terms/concepts that are actually used in the article.
Rules for terms:
- Must be actual technology terminology (like "machine learning", "cloud computing", "neural network")
- Focus on technical concepts, tools, and methodologies
- Exclude company names, product names, and general words
- Terms should be 1-3 words long
- Each term must appear in the article text
- Prefer more specific technical terms over general ones

2. Provide accurate Russian translations for these technical terms

Article Title: {}
Article Content: {}

Format your response EXACTLY as follows (only these two lines):
Keywords: term1, term2, term3, term4, term5
Translations: term1: перевод1, term2: перевод2, term3: перевод3, term4: перевод4, term5: перевод5"#,
        article.title, article.content
    )
}

/// Ask the model for key terms and parse its constrained response.
pub async fn extract(
    provider: &dyn CompletionProvider,
    article: &Article,
) -> Result<Digest, DigestError> {
    let request = LlmRequest::with_prompt(build_prompt(article));
    let response = provider
        .complete(request)
        .await
        .map_err(DigestError::ModelRequest)?;
    parse_response(&response.content)
}

/// Scan the response line by line: a `Keywords:` line carries the term
/// list, a `Translations:` line carries `term: translation` pairs split
/// on the first colon. Lines matching neither prefix are ignored.
pub fn parse_response(response: &str) -> Result<Digest, DigestError> {
    let mut keywords = Vec::new();
    let mut translations = HashMap::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Keywords:") {
            for term in rest.split(',') {
                let term = term.trim();
                if !term.is_empty() {
                    keywords.push(term.to_string());
                }
            }
        } else if let Some(rest) = line.strip_prefix("Translations:") {
            for pair in rest.split(',') {
                if let Some((term, translation)) = pair.split_once(':') {
                    let term = term.trim();
                    let translation = translation.trim();
                    if !term.is_empty() && !translation.is_empty() {
                        translations.insert(term.to_string(), translation.to_string());
                    }
                }
            }
        }
    }

    if keywords.is_empty() {
        return Err(DigestError::EmptyExtraction);
    }

    Ok(Digest {
        keywords,
        translations,
        summary: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords_and_translations() {
        let digest = parse_response("Keywords: cloud, AI\nTranslations: cloud: облако, AI: ИИ")
            .expect("parse");
        assert_eq!(digest.keywords, vec!["cloud", "AI"]);
        assert_eq!(digest.translation("cloud"), Some("облако"));
        assert_eq!(digest.translation("AI"), Some("ИИ"));
    }

    #[test]
    fn keyword_without_translation_is_kept() {
        let digest =
            parse_response("Keywords: cloud, AI\nTranslations: cloud: облако").expect("parse");
        assert_eq!(digest.keywords, vec!["cloud", "AI"]);
        assert_eq!(digest.translation("AI"), None);
    }

    #[test]
    fn missing_keywords_line_fails() {
        let result = parse_response("Translations: cloud: облако");
        assert!(matches!(result, Err(DigestError::EmptyExtraction)));
    }

    #[test]
    fn empty_term_list_fails() {
        let result = parse_response("Keywords:   \nTranslations: cloud: облако");
        assert!(matches!(result, Err(DigestError::EmptyExtraction)));
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let response = "Sure, here is the analysis.\n\
                        Keywords: neural network\n\
                        Some closing remark.\n\
                        Translations: neural network: нейронная сеть";
        let digest = parse_response(response).expect("parse");
        assert_eq!(digest.keywords, vec!["neural network"]);
        assert_eq!(digest.translation("neural network"), Some("нейронная сеть"));
    }

    #[test]
    fn translation_pairs_split_on_first_colon_only() {
        let digest = parse_response(
            "Keywords: TLS\nTranslations: TLS: протокол: защищённый",
        )
        .expect("parse");
        assert_eq!(digest.translation("TLS"), Some("протокол: защищённый"));
    }

    #[test]
    fn blank_translation_sides_are_dropped() {
        let digest = parse_response(
            "Keywords: cloud, AI\nTranslations: cloud: , : ИИ, AI: ИИ",
        )
        .expect("parse");
        assert_eq!(digest.translation("cloud"), None);
        assert_eq!(digest.translation("AI"), Some("ИИ"));
    }

    #[test]
    fn leading_whitespace_before_prefixes_is_tolerated() {
        let digest =
            parse_response("  Keywords: cloud\n  Translations: cloud: облако").expect("parse");
        assert_eq!(digest.keywords, vec!["cloud"]);
        assert_eq!(digest.translation("cloud"), Some("облако"));
    }

    #[test]
    fn prompt_embeds_title_and_content() {
        let article = Article {
            title: "Edge computing grows".to_string(),
            description: String::new(),
            content: "Edge computing moves workloads closer to users.".to_string(),
            url: "https://example.com".to_string(),
            source_name: String::new(),
            author: String::new(),
            published_at: chrono::DateTime::UNIX_EPOCH,
        };
        let prompt = build_prompt(&article);
        assert!(prompt.contains("Edge computing grows"));
        assert!(prompt.contains("workloads closer to users"));
        assert!(prompt.contains("Keywords: term1"));
    }
}
