use super::RecordView;

/// Keep records matching every whitespace-separated keyword of `query`.
///
/// A keyword matches if it is a case-insensitive substring of the name,
/// status, errorType or typeName, or if it equals the group exactly
/// (case-insensitive). The group is never substring-matched.
pub fn search<R: RecordView + Clone>(records: &[R], query: &str) -> Vec<R> {
    let keywords: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if keywords.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches_all(*r, &keywords))
        .cloned()
        .collect()
}

fn matches_all<R: RecordView>(record: &R, keywords: &[String]) -> bool {
    let haystacks = [
        record.name().to_lowercase(),
        record.status().to_lowercase(),
        record.error_type().to_lowercase(),
        record.type_name().to_lowercase(),
    ];
    let group = record.group().to_lowercase();

    keywords
        .iter()
        .all(|kw| haystacks.iter().any(|h| h.contains(kw.as_str())) || group == *kw)
}
