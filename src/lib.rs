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

//! Library for post-processing [KML](https://developers.google.com/kml)
//! route files exported from a route planner.
//!
//! Two independent components:
//!
//! - [`fix`]: repairs exports whose `altitudeMode` is misspelled and whose
//!   coordinate tuples carry a trailing comma when no altitude was recorded.
//!   Mapping services reject both.
//! - [`merge`]: combines the placemarks of several track files into a single
//!   document and optionally thins out coordinates to shrink the result.
//!
//! See [`fix::fix`] and [`merge::build_document`] for information on how to
//! use this library.

use std::io;

use kml::{Kml, KmlWriter};
use thiserror::Error;

mod coords;
pub mod fix;
pub mod merge;

/// This line needs to be prepended to the KML output.
pub const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
/// XML namespace of KML 2.2 documents.
pub const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Error returned from the library operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The document is not well-formed XML.
    #[error("reading XML failed: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Text content could not be decoded.
    #[error("decoding XML text failed: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
    /// KML parsing or writing failed.
    #[error("processing KML failed: {0}")]
    Kml(#[from] kml::Error),
    /// An element the document shape requires is absent.
    #[error("no <{0}> element found")]
    MissingElement(&'static str),
    /// No input files were given.
    #[error("no input files given")]
    NoInput,
    /// The compression rate keeps no coordinates at all.
    #[error("compression rate must be at least 1")]
    InvalidRate,
}

/// Write a complete KML file to `sink`.
///
/// The document is preceded by an XML declaration. Namespace declarations are
/// whatever attributes `kml` carries on its root.
///
/// # Example
/// ```
/// # use kml_fixup::write_kml;
/// let kml = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#
///     .parse::<kml::Kml>()
///     .expect("parsing failed");
/// let mut sink = vec![];
///
/// write_kml(&kml, &mut sink).expect("writing failed");
///
/// let out = String::from_utf8(sink).expect("KML data is not valid UTF-8");
/// assert!(out.starts_with("<?xml"));
/// assert!(out.contains("<Document"));
/// ```
pub fn write_kml(kml: &Kml, mut sink: impl io::Write) -> Result<(), Error> {
    writeln!(&mut sink, "{XML_HEAD}")?;
    let mut writer = KmlWriter::from_writer(&mut sink);
    writer.write(kml)?;
    writeln!(&mut sink)?;

    Ok(())
}
