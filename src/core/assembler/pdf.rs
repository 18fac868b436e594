//! Minimal multi-page image PDF writer built on lopdf.
//!
//! Each page holds one full-bleed RGB image. The page size is the pixel
//! size scaled by `72 / dpi`, which is how a PDF records an image's
//! resolution.

use crate::error::AssemblyError;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Incrementally built image PDF
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    dpi: u32,
}

impl PdfBuilder {
    pub fn new(dpi: u32) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            dpi: dpi.max(1),
        }
    }

    /// Convert pixels to PDF points at the configured resolution
    pub fn to_points(&self, pixels: u32) -> i64 {
        ((pixels as f64 * 72.0 / self.dpi as f64).round() as i64).max(1)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append one page showing `image`
    pub fn add_page(&mut self, image: &RgbImage) -> Result<(), AssemblyError> {
        let (width, height) = image.dimensions();
        let (page_width, page_height) = (self.to_points(width), self.to_points(height));

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            image.as_raw().clone(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(page_width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(page_height),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| AssemblyError::Encode(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(page_width),
                Object::Integer(page_height),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => Object::Reference(image_id),
                },
            },
        });

        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    /// Finish the document and write it to `path`, replacing any file there.
    pub fn write(mut self, path: &Path) -> Result<(), AssemblyError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.compress();

        let file = File::create(path).map_err(|e| AssemblyError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        self.doc
            .save_to(&mut writer)
            .map_err(|e| AssemblyError::Encode(e.to_string()))?;
        writer.flush().map_err(|e| AssemblyError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    #[test]
    fn points_follow_resolution() {
        let builder = PdfBuilder::new(100);
        assert_eq!(builder.to_points(100), 72);
        assert_eq!(builder.to_points(1920), 1382);
    }

    #[test]
    fn written_document_has_one_page_per_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");

        let mut builder = PdfBuilder::new(100);
        builder.add_page(&RgbImage::from_pixel(20, 10, Rgb([200, 10, 10]))).unwrap();
        builder.add_page(&RgbImage::from_pixel(10, 20, Rgb([10, 200, 10]))).unwrap();
        assert_eq!(builder.page_count(), 2);
        builder.write(&path).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
