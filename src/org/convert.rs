use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::loop_state::{LoopConfig, LoopPhase};
use crate::core::marker::Marker;
use crate::core::snapshot::LoopSnapshot;

use super::parser::{OrgParser, ParsedHeading};

/// Parse a loop file into a snapshot.
pub fn parse_snapshot(content: &str, default_duration: u32) -> LoopSnapshot {
    headings_to_snapshot(&OrgParser::parse(content), default_duration)
}

/// Build a snapshot from parsed headings. The first level-1 heading is the
/// loop; level-2 headings under it are its markers. Without a loop heading
/// the loop is idle with `default_duration` and no markers.
pub fn headings_to_snapshot(headings: &[ParsedHeading], default_duration: u32) -> LoopSnapshot {
    let Some(loop_idx) = headings.iter().position(|h| h.level == 1) else {
        return LoopSnapshot::new(LoopConfig::new(default_duration));
    };
    let config = heading_to_config(&headings[loop_idx], default_duration);

    let markers = headings[loop_idx + 1..]
        .iter()
        .take_while(|h| h.level > 1)
        .filter(|h| h.level == 2)
        .filter_map(heading_to_marker)
        .collect();

    LoopSnapshot { config, markers }
}

fn heading_to_config(heading: &ParsedHeading, default_duration: u32) -> LoopConfig {
    let duration_minutes = OrgParser::get_property(&heading.properties, "DURATION")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or_else(|| {
            log::warn!("Loop heading has no valid DURATION, using {}", default_duration);
            default_duration
        });

    let started = OrgParser::get_property(&heading.properties, "STARTED").and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| log::warn!("Ignoring invalid STARTED {:?}: {}", s, e))
            .ok()
    });
    let paused = OrgParser::get_property(&heading.properties, "PAUSED_MS")
        .and_then(|s| s.parse::<u64>().ok());

    // A paused loop has no start instant; PAUSED_MS wins if both are present.
    let phase = match (paused, started) {
        (Some(elapsed_ms), _) => LoopPhase::Paused { elapsed_ms },
        (None, Some(at)) => LoopPhase::Started { at },
        (None, None) => LoopPhase::Idle,
    };

    LoopConfig {
        duration_minutes,
        phase,
    }
}

fn heading_to_marker(heading: &ParsedHeading) -> Option<Marker> {
    let Some(offset_minutes) = OrgParser::get_property(&heading.properties, "OFFSET")
        .and_then(|s| s.parse::<i64>().ok())
    else {
        log::warn!("Skipping marker {:?} without a valid OFFSET", heading.title);
        return None;
    };
    let id = OrgParser::get_property(&heading.properties, "ID")
        .and_then(|s| Uuid::parse_str(s).ok());

    Some(Marker {
        id,
        text: heading.title.clone(),
        offset_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::writer::OrgWriter;
    use chrono::TimeZone;

    #[test]
    fn empty_file_is_default_idle_loop() {
        let snapshot = parse_snapshot("", 25);
        assert_eq!(snapshot.config, LoopConfig::new(25));
        assert!(snapshot.markers.is_empty());
    }

    #[test]
    fn written_snapshot_reads_back() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        let mut snapshot = LoopSnapshot::new(LoopConfig {
            duration_minutes: 30,
            phase: LoopPhase::Started { at },
        });
        snapshot.add_marker(Marker::new("Stretch", 15));
        snapshot.markers.push(Marker {
            id: None,
            text: "Water".into(),
            offset_minutes: 0,
        });

        let parsed = parse_snapshot(&OrgWriter::write_loop_file(&snapshot), 60);
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn marker_text_ending_in_colon_word_reads_back() {
        let mut snapshot = LoopSnapshot::new(LoopConfig::new(60));
        snapshot.add_marker(Marker::new("Call mom :urgent:", 5));
        snapshot.add_marker(Marker::new("Stand up :work:home:", 30));

        let parsed = parse_snapshot(&OrgWriter::write_loop_file(&snapshot), 60);
        assert_eq!(parsed.markers[0].text, "Call mom :urgent:");
        assert_eq!(parsed.markers[1].text, "Stand up :work:home:");
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn marker_without_offset_is_skipped() {
        let input = "\
* Loop
  :PROPERTIES:
  :DURATION: 20
  :PAUSED_MS: 1000
  :END:
** Broken
** Good
   :PROPERTIES:
   :OFFSET: 5
   :END:
";
        let snapshot = parse_snapshot(input, 60);
        assert_eq!(snapshot.config.duration_minutes, 20);
        assert_eq!(snapshot.config.phase, LoopPhase::Paused { elapsed_ms: 1000 });
        assert_eq!(snapshot.markers.len(), 1);
        assert_eq!(snapshot.markers[0].text, "Good");
        assert_eq!(snapshot.markers[0].id, None);
    }

    #[test]
    fn invalid_values_fall_back() {
        let input = "\
* Loop
  :PROPERTIES:
  :DURATION: soon
  :STARTED: yesterday
  :END:
";
        let snapshot = parse_snapshot(input, 45);
        assert_eq!(snapshot.config, LoopConfig::new(45));
    }

    #[test]
    fn headings_after_the_loop_are_ignored() {
        let input = "\
* Loop
  :PROPERTIES:
  :DURATION: 10
  :END:
** A
   :PROPERTIES:
   :OFFSET: 1
   :END:
* Archive
** B
   :PROPERTIES:
   :OFFSET: 2
   :END:
";
        let snapshot = parse_snapshot(input, 60);
        let texts: Vec<&str> = snapshot.markers.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["A"]);
    }
}
