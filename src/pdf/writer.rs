//! # PDF Serializer
//!
//! Turns the canvas's recorded page content streams into a PDF file.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Helvetica is referenced as a standard Type1 font with WinAnsiEncoding.
//! TrueType fonts are embedded whole as CIDFontType2 with Identity-H
//! encoding, producing 5 PDF objects per font: FontFile2, FontDescriptor,
//! CIDFont, ToUnicode CMap, and the root Type0 dictionary.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;

use super::{CanvasPage, Metadata};
use crate::error::SinkError;
use crate::font::{CustomFontMetrics, FontContext, FontData};

pub(crate) struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }
}

impl PdfWriter {
    /// Write the pages to a PDF byte vector.
    ///
    /// `fonts_used` lists canonical family names in resource order (`/F0`,
    /// `/F1`, ...), each with the characters drawn in it.
    pub(crate) fn write(
        pages: &[CanvasPage],
        page_size_pt: (f64, f64),
        fonts_used: &[(String, BTreeSet<char>)],
        fonts: &FontContext,
        metadata: &Metadata,
    ) -> Result<Vec<u8>, SinkError> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        let mut font_ids = Vec::with_capacity(fonts_used.len());
        for (family, chars) in fonts_used {
            let id = match fonts.resolve(family).1 {
                FontData::Standard(_) => builder.push(
                    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                        .to_vec(),
                ),
                FontData::Custom { data, metrics } => {
                    Self::write_custom_font_objects(&mut builder, family, data, metrics, chars)?
                }
            };
            font_ids.push(id);
        }
        let font_resources = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut page_obj_ids = Vec::with_capacity(pages.len());
        for page in pages {
            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            let content_obj_id = builder.push(content_data);

            let annot_ids: Vec<usize> = page
                .links
                .iter()
                .map(|link| {
                    let annot = format!(
                        "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
                         /Border [0 0 0] /A << /S /URI /URI ({}) >> >>",
                        link.rect[0],
                        link.rect[1],
                        link.rect[2],
                        link.rect[3],
                        Self::escape_pdf_string(&link.uri)
                    );
                    builder.push(annot.into_bytes())
                })
                .collect();
            let annots = if annot_ids.is_empty() {
                String::new()
            } else {
                let refs = annot_ids
                    .iter()
                    .map(|id| format!("{} 0 R", id))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(" /Annots [{}]", refs)
            };

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >>{} >>",
                page_size_pt.0, page_size_pt.1, content_obj_id, font_resources, annots
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", Self::text_string(author));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject {} ", Self::text_string(subject));
        }
        let creator = metadata.creator.as_deref().unwrap_or("gridform");
        let _ = write!(
            info,
            "/Creator {} /Producer (gridform {}) >>",
            Self::text_string(creator),
            env!("CARGO_PKG_VERSION")
        );
        let info_obj_id = builder.push(info.into_bytes());

        Ok(Self::serialize(&builder, info_obj_id))
    }

    /// Write the 5 objects of an embedded TrueType font and return the id
    /// of the Type0 dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        family: &str,
        ttf_data: &[u8],
        metrics: &CustomFontMetrics,
        used_chars: &BTreeSet<char>,
    ) -> Result<usize, SinkError> {
        let face = ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| SinkError::UnknownFont(format!("{}: {}", family, e)))?;

        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|ch| metrics.glyph_ids.get(ch).map(|&gid| (*ch, gid)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(family);
        let units_per_em = metrics.units_per_em;

        // 1. FontFile2 stream
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let mut fontfile2_data: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile2_data,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed_ttf.len(),
            ttf_data.len()
        );
        fontfile2_data.extend_from_slice(&compressed_ttf);
        fontfile2_data.extend_from_slice(b"\nendstream");
        let fontfile2_id = builder.push(fontfile2_data);

        // 2. FontDescriptor
        let bbox = face.global_bounding_box();
        let scale = 1000.0 / units_per_em as f64;
        let cap_height = face.capital_height().unwrap_or(metrics.ascender) as f64 * scale;
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            cap_height as i32,
            fontfile2_id,
        );
        let font_descriptor_id = builder.push(font_descriptor_dict.into_bytes());

        // 3. CIDFont dictionary (DescendantFont)
        let w_array = Self::build_w_array(&char_to_gid, &face, units_per_em);
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        let cidfont_id = builder.push(cidfont_dict.into_bytes());

        // 4. ToUnicode CMap
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let mut tounicode_data: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode_data.extend_from_slice(&compressed_cmap);
        tounicode_data.extend_from_slice(b"\nendstream");
        let tounicode_id = builder.push(tounicode_data);

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        Ok(builder.push(type0_dict.into_bytes()))
    }

    fn build_w_array(
        char_to_gid: &HashMap<char, u16>,
        face: &ttf_parser::Face,
        units_per_em: u16,
    ) -> String {
        let scale = 1000.0 / units_per_em as f64;

        let mut seen_gids: HashSet<u16> = HashSet::new();
        let mut entries: Vec<(u16, u32)> = Vec::new();
        for &gid in char_to_gid.values() {
            if !seen_gids.insert(gid) {
                continue;
            }
            let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
            entries.push((gid, (advance as f64 * scale) as u32));
        }
        entries.sort_by_key(|(gid, _)| *gid);

        let mut result = String::from("[");
        for (gid, width) in &entries {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// ToUnicode CMap so text can be copied back out of the PDF.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        gid_to_unicode.sort_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // beginbfchar blocks hold at most 100 entries
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");
        cmap
    }

    /// Strip a family name down to characters legal in a PDF name object.
    pub(crate) fn sanitize_font_name(family: &str) -> String {
        let name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            "CustomFont".to_string()
        } else {
            name
        }
    }

    pub(crate) fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// A PDF text string: literal when ASCII, UTF-16BE hex otherwise.
    fn text_string(s: &str) -> String {
        if s.is_ascii() {
            format!("({})", Self::escape_pdf_string(s))
        } else {
            let mut hex = String::from("<FEFF");
            for unit in s.encode_utf16() {
                let _ = write!(hex, "{:04X}", unit);
            }
            hex.push('>');
            hex
        }
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    pub(crate) fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80),
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85),
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95),
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(PdfWriter::escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_text_string_falls_back_to_utf16() {
        assert_eq!(PdfWriter::text_string("Form"), "(Form)");
        assert_eq!(PdfWriter::text_string("求人"), "<FEFF6C424EBA>");
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(PdfWriter::sanitize_font_name("IPA Gothic"), "IPAGothic");
        assert_eq!(PdfWriter::sanitize_font_name("明朝"), "CustomFont");
    }

    #[test]
    fn test_tounicode_cmap_format() {
        let mut map = HashMap::new();
        map.insert('A', 36u16);
        let cmap = PdfWriter::build_tounicode_cmap(&map, "IPA");
        assert!(cmap.contains("1 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("/CMapName /IPA-UTF16 def"));
    }

    #[test]
    fn test_winansi_mapping() {
        assert_eq!(PdfWriter::unicode_to_winansi('A'), Some(b'A'));
        assert_eq!(PdfWriter::unicode_to_winansi('€'), Some(0x80));
        assert_eq!(PdfWriter::unicode_to_winansi('求'), None);
    }
}
