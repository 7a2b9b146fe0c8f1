use crate::core::loop_state::LoopPhase;
use crate::core::marker::Marker;
use crate::core::snapshot::LoopSnapshot;

/// Writes the loop and its markers to org-mode format.
pub struct OrgWriter;

impl OrgWriter {
    /// Write a complete loop file: one level-1 loop heading, one level-2
    /// heading per marker.
    pub fn write_loop_file(snapshot: &LoopSnapshot) -> String {
        let mut out = String::new();
        let indent = "  ";
        out.push_str("#+TITLE: Loop\n\n");

        out.push_str("* Loop\n");
        out.push_str(&format!("{indent}:PROPERTIES:\n"));
        out.push_str(&format!(
            "{indent}:DURATION: {}\n",
            snapshot.config.duration_minutes
        ));
        match snapshot.config.phase {
            LoopPhase::Idle => {}
            LoopPhase::Started { at } => {
                out.push_str(&format!("{indent}:STARTED: {}\n", at.to_rfc3339()));
            }
            LoopPhase::Paused { elapsed_ms } => {
                out.push_str(&format!("{indent}:PAUSED_MS: {}\n", elapsed_ms));
            }
        }
        out.push_str(&format!("{indent}:END:\n"));

        for marker in &snapshot.markers {
            out.push_str(&Self::write_marker(marker));
        }

        out
    }

    /// Write a single marker as a level-2 heading.
    pub fn write_marker(marker: &Marker) -> String {
        let mut out = String::new();
        let indent = "   ";

        // Headings are line based; keep the text on one line.
        let text = marker.text.lines().next().unwrap_or("").trim();
        out.push_str(&format!("** {}\n", text));

        out.push_str(&format!("{indent}:PROPERTIES:\n"));
        if let Some(id) = marker.id {
            out.push_str(&format!("{indent}:ID: {}\n", id));
        }
        out.push_str(&format!("{indent}:OFFSET: {}\n", marker.offset_minutes));
        out.push_str(&format!("{indent}:END:\n"));

        out
    }
}
