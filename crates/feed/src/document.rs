//! Decoding of the feed's JSON document.
//!
//! The document is an object with a `matches` list. Decoding stops at the
//! first bad entry: the feed is expected to be well-formed, so a broken
//! record fails the whole fetch rather than silently shrinking the schedule.

use serde::Deserialize;

use matchbell_core::{Event, MatchRecord};

use crate::traits::FeedError;

#[derive(Debug, Deserialize)]
struct FeedDocument {
    matches: Vec<serde_json::Value>,
}

/// Decode a raw feed body into events.
pub fn parse_document(body: &[u8]) -> Result<Vec<Event>, FeedError> {
    let doc: FeedDocument =
        serde_json::from_slice(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    let mut events = Vec::with_capacity(doc.matches.len());
    for (index, raw) in doc.matches.into_iter().enumerate() {
        let record: MatchRecord = serde_json::from_value(raw)
            .map_err(|e| FeedError::Parse(format!("match {index}: {e}")))?;
        let event =
            Event::from_record(record).map_err(|source| FeedError::InvalidMatch { index, source })?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_matches_list() {
        let body = br#"{
            "matches": [
                {"Team1": "India", "Team2": "Pakistan", "MatchTime": "2026-03-01T14:00:00Z", "MatchDuration": "480"},
                {"Team1": "England", "Team2": "Australia", "MatchTime": "2026-03-02T09:30:00Z"}
            ]
        }"#;
        let events = parse_document(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].duration_minutes, 480);
        assert_eq!(events[1].duration_minutes, 360);
    }

    #[test]
    fn out_of_range_duration_falls_back() {
        let body = br#"{
            "matches": [
                {"Team1": "A", "Team2": "B", "MatchTime": "2026-03-01T14:00:00Z", "MatchDuration": "9999999999999999"},
                {"Team1": "C", "Team2": "D", "MatchTime": "2026-03-01T14:00:00Z", "MatchDuration": 1e300},
                {"Team1": "India", "Team2": "England", "MatchTime": "2026-03-01T05:00:00Z", "MatchDuration": 7200}
            ]
        }"#;
        let events = parse_document(body).unwrap();
        assert_eq!(events[0].duration_minutes, 360);
        assert_eq!(events[1].duration_minutes, 360);
        assert_eq!(events[2].duration_minutes, 7200);
        assert_eq!((events[0].end() - events[0].start).num_minutes(), 360);
    }

    #[test]
    fn empty_list_is_fine() {
        assert!(parse_document(br#"{"matches": []}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_matches_is_a_parse_error() {
        let err = parse_document(br#"{"fixtures": []}"#).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
        assert!(!err.is_network());
    }

    #[test]
    fn not_json_is_a_parse_error() {
        assert!(matches!(parse_document(b"<html>"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn first_bad_time_aborts_fetch() {
        let body = br#"{
            "matches": [
                {"Team1": "A", "Team2": "B", "MatchTime": "2026-03-01T14:00:00Z"},
                {"Team1": "C", "Team2": "D", "MatchTime": "soon"},
                {"Team1": "E", "Team2": "F", "MatchTime": "2026-03-01T18:00:00Z"}
            ]
        }"#;
        match parse_document(body) {
            Err(FeedError::InvalidMatch { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidMatch, got: {other:?}"),
        }
    }

    #[test]
    fn record_missing_team_is_a_parse_error() {
        let body = br#"{"matches": [{"Team1": "A", "MatchTime": "2026-03-01T14:00:00Z"}]}"#;
        let err = parse_document(body).unwrap_err();
        match err {
            FeedError::Parse(msg) => assert!(msg.contains("match 0")),
            other => panic!("expected Parse error, got: {other:?}"),
        }
    }
}
