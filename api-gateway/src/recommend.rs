//! Static interest-to-certification lookup and built-in certification records.

use std::sync::Arc;

use shared::item::ItemBuilder;
use shared::{Certification, Error, ItemStore, Result};
use tokio::task::JoinSet;

/// Certifications recommended when nothing is known about the user.
pub const DEFAULT_CERT_IDS: [&str; 3] = ["adsp", "aws-saa", "sqld"];

/// Upper bound on interest-based recommendations.
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Interest keywords and the certifications they map to, in priority order.
const INTEREST_TABLE: &[(&[&str], &[&str])] = &[
    (
        &["데이터", "data", "분석", "analytics", "빅데이터"],
        &["adsp", "sqld", "bigdata-engineer"],
    ),
    (
        &["클라우드", "cloud", "aws", "인프라"],
        &["aws-saa", "aws-clf", "azure-az900"],
    ),
    (
        &["ai", "인공지능", "머신러닝", "machine learning", "ml"],
        &["adsp", "aws-mla", "tensorflow-developer"],
    ),
    (
        &["개발", "프로그래밍", "development", "programming", "software"],
        &["info-processing-engineer", "sqld"],
    ),
    (
        &["데이터베이스", "database", "db", "sql"],
        &["sqld", "sqlp"],
    ),
    (
        &["보안", "security", "해킹"],
        &["info-security-engineer", "cissp"],
    ),
    (
        &["네트워크", "network"],
        &["network-manager", "ccna"],
    ),
];

/// What `resolve` does with ids that are not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// Substitute the built-in record when there is one.
    UseBuiltin,
    /// Drop the id.
    Skip,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Korean keywords match anywhere; ASCII keywords only on word boundaries,
/// so "html" does not hit "ml".
fn interest_matches(interest: &str, keyword: &str) -> bool {
    let interest = interest.trim().to_lowercase();
    if interest.is_empty() {
        return false;
    }
    if !keyword.is_ascii() {
        return interest.contains(keyword);
    }

    interest.match_indices(keyword).any(|(start, _)| {
        let before = interest[..start].chars().next_back();
        let after = interest[start + keyword.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Certification ids for the given interests, deduplicated and capped.
///
/// Returns an empty list when no interest matches the table.
pub fn ids_for_interests(interests: &[String]) -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = Vec::new();

    for interest in interests {
        for (keywords, cert_ids) in INTEREST_TABLE {
            if !keywords.iter().any(|k| interest_matches(interest, k)) {
                continue;
            }
            for id in cert_ids.iter() {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
        }
    }

    ids.truncate(MAX_RECOMMENDATIONS);
    ids
}

/// Interest-based ids, or the defaults when nothing matches.
pub fn ids_or_defaults(interests: &[String]) -> Vec<&'static str> {
    let ids = ids_for_interests(interests);
    if ids.is_empty() {
        DEFAULT_CERT_IDS.to_vec()
    } else {
        ids
    }
}

/// Built-in record for a well-known certification.
pub fn builtin(id: &str) -> Option<Certification> {
    let (name, category, level, description) = match id {
        "adsp" => (
            "데이터분석 준전문가 (ADsP)",
            "데이터",
            "초급",
            "데이터 이해, 데이터 분석 기획, 데이터 분석 역량을 검증하는 국가공인 자격",
        ),
        "aws-saa" => (
            "AWS Certified Solutions Architect - Associate",
            "클라우드",
            "중급",
            "AWS 기반의 안정적이고 비용 효율적인 아키텍처 설계 역량을 검증하는 자격",
        ),
        "sqld" => (
            "SQL 개발자 (SQLD)",
            "데이터베이스",
            "초급",
            "데이터 모델링과 SQL 활용 능력을 검증하는 국가공인 자격",
        ),
        _ => return None,
    };

    Some(Certification {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        level: Some(level.to_string()),
        description: description.to_string(),
        search_keywords: Vec::new(),
        raw_data: None,
        updated_at: None,
    })
}

/// The default recommendation records.
pub fn defaults() -> Vec<Certification> {
    DEFAULT_CERT_IDS.iter().filter_map(|id| builtin(id)).collect()
}

/// Look up certifications concurrently, keeping the order of `ids`.
///
/// Ids missing from the table are handled according to `missing`.
pub async fn resolve(
    store: Arc<dyn ItemStore>,
    table: &str,
    ids: Vec<String>,
    missing: Missing,
) -> Result<Vec<Certification>> {
    let mut lookups = JoinSet::new();
    for (index, id) in ids.into_iter().enumerate() {
        let store = Arc::clone(&store);
        let table = table.to_string();
        lookups.spawn(async move {
            let key = ItemBuilder::new().s("id", id.clone()).build();
            let found = match store.get_item(&table, key).await? {
                Some(item) => Some(Certification::from_item(&item)?),
                None if missing == Missing::UseBuiltin => builtin(&id),
                None => None,
            };
            Ok::<_, Error>((index, found))
        });
    }

    let mut found = Vec::new();
    while let Some(joined) = lookups.join_next().await {
        let (index, cert) =
            joined.map_err(|e| Error::Internal(format!("Lookup task failed: {}", e)))??;
        if let Some(cert) = cert {
            found.push((index, cert));
        }
    }

    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, cert)| cert).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MemoryStore;

    #[test]
    fn test_no_interests_uses_defaults() {
        assert!(ids_for_interests(&[]).is_empty());
        assert_eq!(ids_or_defaults(&[]), vec!["adsp", "aws-saa", "sqld"]);
        assert_eq!(ids_or_defaults(&["요리".to_string()]), DEFAULT_CERT_IDS.to_vec());
    }

    #[test]
    fn test_interest_ids_deduplicated_and_capped() {
        let ids = ids_for_interests(&["데이터".to_string(), "SQL".to_string()]);
        assert_eq!(ids, vec!["adsp", "sqld", "bigdata-engineer", "sqlp"]);

        let many = ids_for_interests(&[
            "data".to_string(),
            "cloud".to_string(),
            "security".to_string(),
        ]);
        assert_eq!(many.len(), MAX_RECOMMENDATIONS);
        assert_eq!(&many[..3], &["adsp", "sqld", "bigdata-engineer"]);
    }

    #[test]
    fn test_defaults_are_builtin() {
        let ids: Vec<String> = defaults().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["adsp", "aws-saa", "sqld"]);
    }

    #[tokio::test]
    async fn test_resolve_keeps_order_and_prefers_stored() {
        let store = MemoryStore::new().with_table("Certifications", "id", None);
        let stored = Certification {
            name: "SQLD (stored)".to_string(),
            ..builtin("sqld").unwrap()
        };
        store
            .put_item("Certifications", stored.into_item().unwrap())
            .await
            .unwrap();

        let store: Arc<dyn ItemStore> = Arc::new(store);
        let ids = vec!["sqld".to_string(), "unknown".to_string(), "adsp".to_string()];
        let certs = resolve(store.clone(), "Certifications", ids.clone(), Missing::UseBuiltin)
            .await
            .unwrap();

        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].name, "SQLD (stored)");
        assert_eq!(certs[1].id, "adsp");

        let stored_only = resolve(store, "Certifications", ids, Missing::Skip)
            .await
            .unwrap();
        assert_eq!(stored_only.len(), 1);
        assert_eq!(stored_only[0].id, "sqld");
    }

    #[test]
    fn test_ascii_keywords_match_whole_words() {
        assert!(ids_for_interests(&["blockchain".to_string()]).is_empty());
        assert!(ids_for_interests(&["html".to_string()]).is_empty());
        assert!(ids_for_interests(&["dbms".to_string()]).is_empty());

        assert_eq!(
            ids_for_interests(&["AI 엔지니어".to_string()]),
            vec!["adsp", "aws-mla", "tensorflow-developer"]
        );
        assert_eq!(ids_for_interests(&["cloud-native".to_string()])[0], "aws-saa");
        assert_eq!(
            ids_for_interests(&["machine learning".to_string()]),
            vec!["adsp", "aws-mla", "tensorflow-developer"]
        );
        // Korean keywords still match inside longer words
        assert_eq!(ids_for_interests(&["빅데이터분석".to_string()])[0], "adsp");
    }
}
