use chrono::{DateTime, Utc};

use crate::error::DigestError;
use crate::news::Article;

/// Vocabulary matched case-insensitively against title + description.
/// Each hit is worth 20 points.
const TECH_KEYWORDS: &[&str] = &[
    "technology",
    "tech",
    "software",
    "AI",
    "artificial intelligence",
    "cybersecurity",
    "digital",
    "innovation",
    "startup",
    "algorithm",
    "cloud",
    "data",
    "security",
    "privacy",
    "blockchain",
    "machine learning",
];

/// Score a candidate: longer text, attribution, freshness and technology
/// keywords all add up. Higher wins.
fn score_article(article: &Article, now: DateTime<Utc>) -> i64 {
    let mut score = (article.content.len() / 10) as i64 + (article.description.len() / 10) as i64;

    if !article.author.is_empty() {
        score += 50;
    }
    if !article.source_name.is_empty() {
        score += 30;
    }

    let hours_ago = now.signed_duration_since(article.published_at).num_hours();
    if hours_ago < 24 {
        score += 100;
    } else if hours_ago < 48 {
        score += 50;
    }

    let haystack = format!("{} {}", article.title, article.description).to_lowercase();
    for keyword in TECH_KEYWORDS {
        if haystack.contains(&keyword.to_lowercase()) {
            score += 20;
        }
    }

    score
}

/// Pick the highest-scoring candidate (first seen wins ties), then
/// normalize its body for extraction.
pub fn select_best(candidates: Vec<Article>) -> Result<Article, DigestError> {
    select_at(candidates, Utc::now())
}

fn select_at(candidates: Vec<Article>, now: DateTime<Utc>) -> Result<Article, DigestError> {
    if candidates.is_empty() {
        return Err(DigestError::NoCandidates);
    }

    let mut best_index = 0;
    let mut best_score = i64::MIN;
    for (index, article) in candidates.iter().enumerate() {
        let score = score_article(article, now);
        if score > best_score {
            best_index = index;
            best_score = score;
        }
    }

    let mut candidates = candidates;
    Ok(normalize(candidates.swap_remove(best_index)))
}

/// Upstream feeds often truncate `content` harder than `description`; when
/// that happens the description is the richer body and is prepended.
fn normalize(mut article: Article) -> Article {
    if article.content.len() < article.description.len() {
        article.content = format!("{}\n\n{}", article.description, article.content);
    }
    article.content = clean_content(&article.content);
    article
}

/// Strip truncation artifacts ("[+123 chars]" fragments), collapse
/// whitespace runs, and break paragraphs after sentence ends.
pub fn clean_content(content: &str) -> String {
    let content = content.replace("chars]", "").replace("[+", "");
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(". ", ".\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(title: &str, description: &str, content: &str) -> Article {
        Article {
            title: title.to_string(),
            description: description.to_string(),
            content: content.to_string(),
            url: "https://example.com/article".to_string(),
            source_name: String::new(),
            author: String::new(),
            published_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            select_best(Vec::new()),
            Err(DigestError::NoCandidates)
        ));
    }

    #[test]
    fn single_candidate_is_chosen() {
        let a = article("Solo", "only candidate", "short body");
        let chosen = select_best(vec![a.clone()]).expect("select");
        assert_eq!(chosen.title, a.title);
        assert_eq!(chosen.url, a.url);
    }

    #[test]
    fn chosen_article_comes_from_the_input_set() {
        let batch = vec![
            article("One", "plain", "body text one"),
            article("Two", "tech startup cloud", "a much longer body text here"),
            article("Three", "plain", "body"),
        ];
        let titles: Vec<String> = batch.iter().map(|a| a.title.clone()).collect();
        let chosen = select_best(batch).expect("select");
        assert!(titles.contains(&chosen.title));
    }

    #[test]
    fn selection_is_deterministic() {
        let now = Utc::now();
        let batch = || {
            vec![
                article("One", "software and AI news", "content body"),
                article("Two", "software and AI news", "content body"),
            ]
        };
        let first = select_at(batch(), now).expect("select");
        let second = select_at(batch(), now).expect("select");
        assert_eq!(first, second);
    }

    #[test]
    fn ties_go_to_the_first_seen() {
        let now = Utc::now();
        let batch = vec![
            article("First", "identical", "identical body"),
            article("Second", "identical", "identical body"),
        ];
        let chosen = select_at(batch, now).expect("select");
        assert_eq!(chosen.title, "First");
    }

    #[test]
    fn recency_outweighs_modest_length() {
        let now = Utc::now();
        let mut fresh = article("Fresh", "news", "body");
        fresh.published_at = now - Duration::hours(1);
        let mut stale = article("Stale", "news", "a somewhat longer body text");
        stale.published_at = now - Duration::hours(72);
        let chosen = select_at(vec![stale, fresh], now).expect("select");
        assert_eq!(chosen.title, "Fresh");
    }

    #[test]
    fn keyword_matches_are_case_insensitive() {
        let now = Utc::now();
        let plain = article("Weather", "sunny outlook today forever", "b");
        let techy = article("MACHINE LEARNING WINS", "CYBERSECURITY report", "b");
        let chosen = select_at(vec![plain, techy], now).expect("select");
        assert_eq!(chosen.title, "MACHINE LEARNING WINS");
    }

    #[test]
    fn short_content_gets_description_prepended() {
        let description = "d".repeat(200);
        let content = "c".repeat(50);
        let mut a = article("Padded", &description, &content);
        a.published_at = Utc::now();
        let chosen = select_best(vec![a]).expect("select");
        assert_eq!(chosen.content, clean_content(&format!("{}\n\n{}", description, content)));
        assert!(chosen.content.starts_with(&description));
    }

    #[test]
    fn content_longer_than_description_is_left_alone() {
        let mut a = article("Long", "short", "a body clearly longer than the description");
        a.published_at = Utc::now();
        let chosen = select_best(vec![a.clone()]).expect("select");
        assert_eq!(chosen.content, clean_content(&a.content));
    }

    #[test]
    fn cleaning_strips_truncation_artifacts() {
        let cleaned = clean_content("Breaking news body [+1234 chars]");
        assert!(!cleaned.contains("[+"));
        assert!(!cleaned.contains("chars]"));
        assert!(cleaned.contains("Breaking news body"));
    }

    #[test]
    fn cleaning_collapses_whitespace_and_breaks_sentences() {
        let cleaned = clean_content("First   sentence. Second\n\tsentence. End");
        assert_eq!(cleaned, "First sentence.\n\nSecond sentence.\n\nEnd");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let raw = "One sentence. Two   sentence. Three [+99 chars]";
        let once = clean_content(raw);
        assert_eq!(clean_content(&once), once);
    }
}
