// Copyright 2023 Viktor Reusch
//
// This file is part of kml_fixup.
//
// kml_fixup is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_fixup is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_fixup. If not, see <https://www.gnu.org/licenses/>.

//! Repair of broken KML exports.
//!
//! The exports in question misspell the `altitudeMode` enumeration for line
//! strings as `"clampedToGround"`
//! (<https://developers.google.com/kml/documentation/kmlreference#elements-specific-to-linestring>)
//! and leave a trailing comma on every coordinate tuple without a recorded
//! altitude. This module rewrites both in a single pass over the XML events
//! and copies everything else through unchanged.
//!
//! The repair works below the KML level on purpose: the trailing commas are
//! invalid coordinate syntax, so a typed KML parser refuses the very
//! documents this module exists to fix.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use log::info;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{coords, Error, XML_HEAD};

/// The only correct spelling of the altitude mode for clamped lines.
const CLAMP_TO_GROUND: &str = "clampToGround";

/// Repair a single broken KML document.
///
/// A complete KML file is read from `source`. The repaired data is written as
/// a complete KML file to `sink`, starting with an XML declaration (any
/// declaration in the input is replaced).
///
/// Exactly one `LineString` is expected per document; only the first one in
/// document order is repaired and any later ones are copied through
/// untouched. Elements are matched by their XML local name, so both
/// default-namespace and prefixed documents are handled. Within that
/// `LineString`, the `altitudeMode` text is overwritten with
/// `"clampToGround"` no matter what it was, and the `coordinates` text is
/// rebuilt with empty tuple components dropped and tuples joined by
/// newlines.
///
/// If no `LineString` is found, or the first one has no `altitudeMode` or no
/// `coordinates`, an [`Error::MissingElement`] naming the absent element is
/// returned. The `sink` might have been partially written in this case.
///
/// # Example
/// ```
/// # use kml_fixup::fix::fix;
/// let source = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <kml xmlns="http://www.opengis.net/kml/2.2"><Document><Placemark><LineString>
/// <altitudeMode>clampedToGround</altitudeMode>
/// <coordinates>7.1,50.7, 7.2,50.8,</coordinates>
/// </LineString></Placemark></Document></kml>"#;
/// let mut sink = vec![];
///
/// fix(source.as_bytes(), &mut sink).expect("repair failed");
///
/// let kml = String::from_utf8(sink).expect("KML data is not valid UTF-8");
/// assert!(kml.contains("<altitudeMode>clampToGround</altitudeMode>"));
/// assert!(kml.contains("7.1,50.7\n7.2,50.8"));
/// ```
pub fn fix(mut source: impl Read, mut sink: impl io::Write) -> Result<(), Error> {
    let mut text = String::new();
    source.read_to_string(&mut text)?;

    writeln!(&mut sink, "{XML_HEAD}")?;
    let mut reader = Reader::from_str(&text);
    let mut writer = Writer::new(&mut sink);

    // Element nesting depth; text at depth 0 is inter-document whitespace.
    let mut depth = 0usize;
    let mut seen_line_string = false;
    // The flags below only ever refer to the first LineString.
    let mut in_line_string = false;
    let mut in_altitude_mode = false;
    let mut in_coordinates = false;
    let mut fixed_altitude_mode = false;
    let mut fixed_coordinates = false;
    let mut coordinates = String::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            // The input declaration is replaced by our own.
            Event::Decl(_) => {}
            Event::Start(e) => {
                if !seen_line_string && e.local_name().as_ref() == b"LineString" {
                    seen_line_string = true;
                    in_line_string = true;
                } else if in_line_string && e.local_name().as_ref() == b"altitudeMode" {
                    in_altitude_mode = true;
                    fixed_altitude_mode = true;
                } else if in_line_string && e.local_name().as_ref() == b"coordinates" {
                    in_coordinates = true;
                    coordinates.clear();
                }
                depth += 1;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                if in_line_string && e.local_name().as_ref() == b"altitudeMode" {
                    // Expand to a non-empty element so it can carry the text.
                    fixed_altitude_mode = true;
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Text(BytesText::new(CLAMP_TO_GROUND)))?;
                    writer.write_event(Event::End(end))?;
                } else {
                    if in_line_string && e.local_name().as_ref() == b"coordinates" {
                        fixed_coordinates = true;
                    }
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                if in_altitude_mode && e.local_name().as_ref() == b"altitudeMode" {
                    in_altitude_mode = false;
                    writer.write_event(Event::Text(BytesText::new(CLAMP_TO_GROUND)))?;
                } else if in_coordinates && e.local_name().as_ref() == b"coordinates" {
                    in_coordinates = false;
                    fixed_coordinates = true;
                    let repaired = coords::repair_sequence(&coordinates);
                    writer.write_event(Event::Text(BytesText::new(&repaired)))?;
                } else if in_line_string && e.local_name().as_ref() == b"LineString" {
                    in_line_string = false;
                    if !fixed_altitude_mode {
                        return Err(Error::MissingElement("altitudeMode"));
                    }
                    if !fixed_coordinates {
                        return Err(Error::MissingElement("coordinates"));
                    }
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e))?;
            }
            Event::Text(t) => {
                if in_altitude_mode {
                    // Replaced wholesale at the closing tag.
                } else if in_coordinates {
                    coordinates.push_str(&t.decode()?);
                } else if depth > 0 || !t.iter().all(|b| b.is_ascii_whitespace()) {
                    writer.write_event(Event::Text(t))?;
                }
            }
            Event::CData(t) => {
                if in_coordinates {
                    coordinates.push_str(&t.decode()?);
                } else if !in_altitude_mode {
                    writer.write_event(Event::CData(t))?;
                }
            }
            event => {
                if !in_altitude_mode && !in_coordinates {
                    writer.write_event(event)?;
                }
            }
        }
    }

    if !seen_line_string {
        return Err(Error::MissingElement("LineString"));
    }
    writeln!(&mut sink)?;

    Ok(())
}

/// Repair the file at `input`, writing the result to `output`.
///
/// The input file is never modified.
pub fn fix_file(input: &Path, output: &Path) -> Result<(), Error> {
    let source = File::open(input)?;
    let mut sink = BufWriter::new(File::create(output)?);
    fix(source, &mut sink)?;
    sink.flush()?;

    Ok(())
}

/// Repair a directory full of broken KML files.
///
/// Every entry of `input` is repaired (no filtering by extension) and written
/// under the same name into `output`, which must already exist. Entries are
/// processed in file-name order and a notice is logged before each one, so
/// the last attempted file is identifiable when an entry fails. The first
/// failure aborts the pass.
pub fn fix_dir(input: &Path, output: &Path) -> Result<(), Error> {
    let mut entries = fs::read_dir(input)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in &entries {
        let source = entry.path();
        let target = output.join(entry.file_name());
        info!("fixing {} -> {}", source.display(), target.display());
        fix_file(&source, &target)?;
    }

    Ok(())
}
