//! Extraction instruction templates per document class.
//!
//! Instructions and document content travel as separate fields all the way
//! to the wire. The Responses API keeps them in distinct request fields;
//! collapsing them into one blob measurably degrades extraction quality.

use crate::config::DocClass;

const SCHEDULE_INSTRUCTIONS: &str = "You are extracting structured data from a construction \
schedule sheet. Return a single JSON object with every row of every schedule table, \
preserving column headers exactly as printed. Include panel, fixture, and equipment \
designations verbatim. Do not summarize, do not omit rows, do not add prose.";

const SPECIFICATION_INSTRUCTIONS: &str = "You are extracting structured data from a \
construction specification document. Return a single JSON object keyed by section number \
with title, referenced standards, and product requirements for each section. Keep section \
numbering exactly as printed. Do not summarize narrative text; extract requirements only.";

const DRAWING_INSTRUCTIONS: &str = "You are extracting structured data from a construction \
drawing sheet. Return a single JSON object with sheet metadata (number, title, discipline, \
revision), general notes, keynotes, and any tabular data present. Transcribe identifiers \
verbatim. Respond with JSON only.";

pub fn instructions_for(class: DocClass) -> &'static str {
    match class {
        DocClass::Schedule => SCHEDULE_INSTRUCTIONS,
        DocClass::Specification => SPECIFICATION_INSTRUCTIONS,
        DocClass::Drawing => DRAWING_INSTRUCTIONS,
    }
}
