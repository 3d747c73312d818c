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

//! Merging and compressing of KML track files.
//!
//! Mapping services cap both the size of an uploaded file and the number of
//! layers per map (Google Maps: 5 MB and 10 layers), so a collection of
//! single-track files quickly stops fitting. [`build_document`] folds many
//! track files into one document and [`compress_coordinates`] thins out the
//! coordinate density to bring the size down.

use std::fs;
use std::mem;
use std::path::Path;

use kml::types::{Coord, Element, Geometry, Placemark};
use kml::Kml;
use log::info;

use crate::{coords, Error};

/// Combine several KML track files into a single document.
///
/// The first file is parsed completely and becomes the output: its
/// `Document` element is reused as the container, which keeps its
/// document-level metadata, styles, and the namespace declarations on the
/// root. From every following file only the first `Placemark` in document
/// order is taken (one placemark per auxiliary file is supported) and
/// appended to that container, in input order.
///
/// Fails with [`Error::NoInput`] for an empty `paths`, and with
/// [`Error::MissingElement`] if the first file has no `Document` or a later
/// file has no `Placemark`.
pub fn build_document<P: AsRef<Path>>(paths: &[P]) -> Result<Kml, Error> {
    let (first, rest) = paths.split_first().ok_or(Error::NoInput)?;

    info!("loading {}", first.as_ref().display());
    let mut merged = read_kml(first.as_ref())?;
    let elements = document_elements(&mut merged).ok_or(Error::MissingElement("Document"))?;

    for path in rest {
        info!("loading {}", path.as_ref().display());
        let placemark =
            first_placemark(read_kml(path.as_ref())?).ok_or(Error::MissingElement("Placemark"))?;
        elements.push(Kml::Placemark(placemark));
    }

    Ok(merged)
}

/// Thin out every coordinate sequence in the document.
///
/// Each sequence is subsampled independently: the tuple at position `i` is
/// kept exactly when `i % rate == 0`, so the first tuple always survives and
/// the relative order of the rest is preserved. A `rate` of 1 keeps
/// everything; a `rate` of 0 is rejected with [`Error::InvalidRate`]. Line
/// strings, linear rings (polygon rings included), and nested multi
/// geometries are all covered, as are `coordinates` elements that survived
/// parsing as untyped elements. Points keep their single coordinate.
pub fn compress_coordinates(kml: &mut Kml, rate: usize) -> Result<(), Error> {
    if rate == 0 {
        return Err(Error::InvalidRate);
    }
    if rate > 1 {
        compress_kml(kml, rate);
    }

    Ok(())
}

/// Parse the KML file at `path`.
fn read_kml(path: &Path) -> Result<Kml, Error> {
    let kml = fs::read_to_string(path)?.parse::<Kml>()?;
    Ok(kml)
}

/// Find the child list of the first `Document` element.
fn document_elements(kml: &mut Kml) -> Option<&mut Vec<Kml>> {
    match kml {
        Kml::Document { elements, .. } => Some(elements),
        Kml::KmlDocument(doc) => doc.elements.iter_mut().find_map(document_elements),
        Kml::Folder { elements, .. } => elements.iter_mut().find_map(document_elements),
        _ => None,
    }
}

/// Take the first `Placemark` out of a parsed document.
fn first_placemark(kml: Kml) -> Option<Placemark> {
    match kml {
        Kml::Placemark(placemark) => Some(placemark),
        Kml::KmlDocument(doc) => doc.elements.into_iter().find_map(first_placemark),
        Kml::Document { elements, .. } => elements.into_iter().find_map(first_placemark),
        Kml::Folder { elements, .. } => elements.into_iter().find_map(first_placemark),
        _ => None,
    }
}

fn compress_kml(kml: &mut Kml, rate: usize) {
    match kml {
        Kml::KmlDocument(doc) => doc
            .elements
            .iter_mut()
            .for_each(|element| compress_kml(element, rate)),
        Kml::Document { elements, .. } => elements
            .iter_mut()
            .for_each(|element| compress_kml(element, rate)),
        Kml::Folder { elements, .. } => elements
            .iter_mut()
            .for_each(|element| compress_kml(element, rate)),
        Kml::Placemark(placemark) => {
            if let Some(geometry) = placemark.geometry.as_mut() {
                compress_geometry(geometry, rate);
            }
            placemark
                .children
                .iter_mut()
                .for_each(|child| compress_element(child, rate));
        }
        Kml::Element(element) => compress_element(element, rate),
        _ => {}
    }
}

fn compress_geometry(geometry: &mut Geometry, rate: usize) {
    match geometry {
        Geometry::LineString(line) => subsample_coords(&mut line.coords, rate),
        Geometry::LinearRing(ring) => subsample_coords(&mut ring.coords, rate),
        Geometry::Polygon(polygon) => {
            subsample_coords(&mut polygon.outer.coords, rate);
            for ring in &mut polygon.inner {
                subsample_coords(&mut ring.coords, rate);
            }
        }
        Geometry::MultiGeometry(multi) => multi
            .geometries
            .iter_mut()
            .for_each(|geometry| compress_geometry(geometry, rate)),
        // A point's single coordinate sits at position 0 and is always kept.
        _ => {}
    }
}

fn subsample_coords(coords: &mut Vec<Coord>, rate: usize) {
    *coords = mem::take(coords).into_iter().step_by(rate).collect();
}

/// Untyped elements can still carry coordinate sequences as plain text.
fn compress_element(element: &mut Element, rate: usize) {
    if element.name == "coordinates" {
        if let Some(content) = element.content.take() {
            element.content = Some(coords::subsample(&content, rate));
        }
    }
    element
        .children
        .iter_mut()
        .for_each(|child| compress_element(child, rate));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{write_kml, KML_NS, XML_HEAD};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn track(name: &str, coordinates: &str) -> String {
        format!(
            r#"<kml xmlns="{KML_NS}"><Document><name>{name}</name><Placemark><name>{name}</name><LineString><coordinates>{coordinates}</coordinates></LineString></Placemark></Document></kml>"#
        )
    }

    fn write_track(dir: &Path, file: &str, name: &str, coordinates: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, track(name, coordinates)).unwrap();
        path
    }

    fn document_elements_ref(kml: &Kml) -> Option<&Vec<Kml>> {
        match kml {
            Kml::Document { elements, .. } => Some(elements),
            Kml::KmlDocument(doc) => doc.elements.iter().find_map(document_elements_ref),
            Kml::Folder { elements, .. } => elements.iter().find_map(document_elements_ref),
            _ => None,
        }
    }

    fn placemark_names(kml: &Kml) -> Vec<String> {
        document_elements_ref(kml)
            .unwrap()
            .iter()
            .filter_map(|element| match element {
                Kml::Placemark(placemark) => placemark.name.clone(),
                _ => None,
            })
            .collect()
    }

    fn first_line_string_coords(kml: &Kml) -> Option<&Vec<Coord>> {
        match kml {
            Kml::KmlDocument(doc) => doc.elements.iter().find_map(first_line_string_coords),
            Kml::Document { elements, .. } => {
                elements.iter().find_map(first_line_string_coords)
            }
            Kml::Folder { elements, .. } => elements.iter().find_map(first_line_string_coords),
            Kml::Placemark(placemark) => match &placemark.geometry {
                Some(Geometry::LineString(line)) => Some(&line.coords),
                _ => None,
            },
            _ => None,
        }
    }

    const TEN_POINTS: &str = "0,0 1,1 2,2 3,3 4,4 5,5 6,6 7,7 8,8 9,9";

    #[test]
    fn merges_placemarks_in_input_order() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write_track(dir.path(), "a.kml", "a", "1,2 3,4"),
            write_track(dir.path(), "b.kml", "b", "5,6 7,8"),
            write_track(dir.path(), "c.kml", "c", "9,10 11,12"),
        ];

        let merged = build_document(&paths).unwrap();

        assert_eq!(placemark_names(&merged), ["a", "b", "c"]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = build_document::<PathBuf>(&[]).unwrap_err();
        assert!(matches!(err, Error::NoInput));
    }

    #[test]
    fn first_file_without_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bare.kml");
        fs::write(
            &path,
            format!(r#"<kml xmlns="{KML_NS}"><Placemark><name>p</name></Placemark></kml>"#),
        )
        .unwrap();

        let err = build_document(&[path]).unwrap_err();
        assert!(matches!(err, Error::MissingElement("Document")));
    }

    #[test]
    fn later_file_without_placemark_is_an_error() {
        let dir = TempDir::new().unwrap();
        let first = write_track(dir.path(), "a.kml", "a", "1,2 3,4");
        let empty = dir.path().join("empty.kml");
        fs::write(
            &empty,
            format!(r#"<kml xmlns="{KML_NS}"><Document><name>empty</name></Document></kml>"#),
        )
        .unwrap();

        let err = build_document(&[first, empty]).unwrap_err();
        assert!(matches!(err, Error::MissingElement("Placemark")));
    }

    #[test]
    fn compress_keeps_every_nth_coordinate() {
        let mut kml = track("t", TEN_POINTS).parse::<Kml>().unwrap();

        compress_coordinates(&mut kml, 5).unwrap();

        let coords = first_line_string_coords(&kml).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0].x, 0.0);
        assert_eq!(coords[1].x, 5.0);
    }

    #[test]
    fn compress_rate_one_keeps_everything() {
        let mut kml = track("t", TEN_POINTS).parse::<Kml>().unwrap();

        compress_coordinates(&mut kml, 1).unwrap();

        assert_eq!(first_line_string_coords(&kml).unwrap().len(), 10);
    }

    #[test]
    fn compress_rate_zero_is_rejected() {
        let mut kml = track("t", TEN_POINTS).parse::<Kml>().unwrap();

        let err = compress_coordinates(&mut kml, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidRate));
    }

    #[test]
    fn compress_reaches_untyped_coordinates_elements() {
        let source = format!(
            r#"<kml xmlns="{KML_NS}"><Document><coordinates>0,0 1,1 2,2 3,3</coordinates></Document></kml>"#
        );
        let mut kml = source.parse::<Kml>().unwrap();

        compress_coordinates(&mut kml, 2).unwrap();

        let content = document_elements_ref(&kml)
            .unwrap()
            .iter()
            .find_map(|element| match element {
                Kml::Element(element) if element.name == "coordinates" => {
                    element.content.clone()
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(content, "0,0\n2,2");
    }

    #[test]
    fn merged_output_is_valid_kml() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write_track(dir.path(), "a.kml", "a", "0,0 1,1 2,2 3,3"),
            write_track(dir.path(), "b.kml", "b", "4,4 5,5 6,6 7,7"),
            write_track(dir.path(), "c.kml", "c", "8,8 9,9 10,10 11,11"),
        ];

        let mut merged = build_document(&paths).unwrap();
        compress_coordinates(&mut merged, 2).unwrap();
        let mut sink = vec![];
        write_kml(&merged, &mut sink).unwrap();

        let out = String::from_utf8(sink).unwrap();
        assert!(out.starts_with(XML_HEAD));
        let reparsed = out.parse::<Kml>().unwrap();
        assert_eq!(placemark_names(&reparsed), ["a", "b", "c"]);
        assert_eq!(first_line_string_coords(&reparsed).unwrap().len(), 2);
    }
}
