//! Shared fixtures: a PDF assembler and a synthetic TrueType font.

/// Assemble a PDF file from object bodies numbered contiguously from 1,
/// generating the header, xref table and trailer. Object 1 is the
/// catalog.
pub fn build_pdf(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let mut offsets = vec![];

    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_pos = out.len();
    let count = objects.len() + 1;

    out.extend_from_slice(format!("xref\n0 {count}\n").as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");

    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }

    out.extend_from_slice(
        format!("trailer\n<< /Size {count} /Root 1 0 R >>\nstartxref\n{xref_pos}\n%%EOF")
            .as_bytes(),
    );

    out
}

/// A single-page PDF with the given content stream and page-level
/// resource entries (e.g. `/Font << … >>`).
pub fn single_page_pdf(media_box: &str, content: &[u8], resources: &str, extra: &[Vec<u8>]) -> Vec<u8> {
    let mut objects = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox {media_box} /Resources << {resources} >> /Contents 4 0 R >>"
        )
        .into_bytes(),
        {
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            stream
        },
    ];

    objects.extend_from_slice(extra);

    build_pdf(&objects)
}

/// Wrap raw payload bytes in a stream object body.
pub fn stream_object(dict_entries: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "<< {dict_entries} /Length {} >>\nstream\n",
        payload.len()
    )
    .into_bytes();
    body.extend_from_slice(payload);
    body.extend_from_slice(b"\nendstream");

    body
}

// ---------------------------------------------------------------------
// Synthetic TrueType font.
// ---------------------------------------------------------------------

fn push16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// A simple rectangle glyph covering `(x0, y0)..(x1, y1)` in font units.
fn box_glyph(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<u8> {
    let mut g = vec![];

    push_i16(&mut g, 1); // one contour
    push_i16(&mut g, x0);
    push_i16(&mut g, y0);
    push_i16(&mut g, x1);
    push_i16(&mut g, y1);
    push16(&mut g, 3); // last point index
    push16(&mut g, 0); // no instructions

    // Four on-curve points with 16-bit deltas.
    g.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]);

    // X deltas: x0, x1-x0, 0, -(x1-x0).
    push_i16(&mut g, x0);
    push_i16(&mut g, x1 - x0);
    push_i16(&mut g, 0);
    push_i16(&mut g, -(x1 - x0));
    // Y deltas: y0, 0, y1-y0, 0.
    push_i16(&mut g, y0);
    push_i16(&mut g, 0);
    push_i16(&mut g, y1 - y0);
    push_i16(&mut g, 0);

    g
}

/// A compound glyph combining `base` unshifted and `accent` shifted by
/// `(dx, dy)`.
fn compound_glyph(base: u16, accent: u16, dx: i16, dy: i16) -> Vec<u8> {
    let mut g = vec![];

    push_i16(&mut g, -1);
    for _ in 0..4 {
        push_i16(&mut g, 0);
    }

    // ARGS_ARE_XY_VALUES | ARGS_ARE_WORDS | MORE_COMPONENTS.
    push16(&mut g, 0x0002 | 0x0001 | 0x0020);
    push16(&mut g, base);
    push_i16(&mut g, 0);
    push_i16(&mut g, 0);

    // ARGS_ARE_XY_VALUES | ARGS_ARE_WORDS.
    push16(&mut g, 0x0002 | 0x0001);
    push16(&mut g, accent);
    push_i16(&mut g, dx);
    push_i16(&mut g, dy);

    g
}

/// A format 4 cmap with one segment per mapping plus the terminator.
fn cmap_table(mappings: &[(u16, u16)]) -> Vec<u8> {
    let seg_count = (mappings.len() + 1) as u16;

    let mut sub = vec![];
    push16(&mut sub, 4); // format
    push16(&mut sub, 0); // length, fixed up below
    push16(&mut sub, 0); // language
    push16(&mut sub, seg_count * 2);
    push16(&mut sub, 0); // searchRange (unused by readers)
    push16(&mut sub, 0); // entrySelector
    push16(&mut sub, 0); // rangeShift

    for (code, _) in mappings {
        push16(&mut sub, *code); // endCode
    }
    push16(&mut sub, 0xFFFF);
    push16(&mut sub, 0); // reservedPad

    for (code, _) in mappings {
        push16(&mut sub, *code); // startCode
    }
    push16(&mut sub, 0xFFFF);

    for (code, gid) in mappings {
        push16(&mut sub, gid.wrapping_sub(*code)); // idDelta
    }
    push16(&mut sub, 1);

    for _ in 0..seg_count {
        push16(&mut sub, 0); // idRangeOffset
    }

    let len = sub.len() as u16;
    sub[2..4].copy_from_slice(&len.to_be_bytes());

    let mut table = vec![];
    push16(&mut table, 0); // version
    push16(&mut table, 1); // one subtable
    push16(&mut table, 3); // windows
    push16(&mut table, 1); // unicode bmp
    push32(&mut table, 12);
    table.extend_from_slice(&sub);

    table
}

/// Build a complete font:
/// - glyph 0: empty (.notdef)
/// - glyph 1: a box from (100, 0) to (500, 600)
/// - glyph 2: an accent box from (0, 650) to (400, 750)
/// - glyph 3: a compound of glyph 1 plus glyph 2 shifted by (100, 100)
///
/// 1000 units per em; every glyph advances 600 units. `mappings` routes
/// character codes to glyph ids through a format 4 cmap.
pub fn build_test_font(mappings: &[(u16, u16)]) -> Vec<u8> {
    let glyphs: Vec<Vec<u8>> = vec![
        vec![],
        box_glyph(100, 0, 500, 600),
        box_glyph(0, 650, 400, 750),
        compound_glyph(1, 2, 100, 100),
    ];
    let num_glyphs = glyphs.len() as u16;

    // glyf + long loca.
    let mut glyf = vec![];
    let mut loca = vec![];

    for glyph in &glyphs {
        loca.push(glyf.len() as u32);
        glyf.extend_from_slice(glyph);
        // Glyph records are 2-byte aligned.
        if glyf.len() % 2 != 0 {
            glyf.push(0);
        }
    }
    loca.push(glyf.len() as u32);

    let mut loca_table = vec![];
    for offset in &loca {
        push32(&mut loca_table, *offset);
    }

    // head
    let mut head = vec![];
    push32(&mut head, 0x0001_0000); // version
    push32(&mut head, 0); // fontRevision
    push32(&mut head, 0); // checkSumAdjustment
    push32(&mut head, 0x5F0F_3CF5); // magicNumber
    push16(&mut head, 0); // flags
    push16(&mut head, 1000); // unitsPerEm
    head.extend_from_slice(&[0; 16]); // created + modified
    push_i16(&mut head, 0); // xMin
    push_i16(&mut head, 0); // yMin
    push_i16(&mut head, 600); // xMax
    push_i16(&mut head, 850); // yMax
    push16(&mut head, 0); // macStyle
    push16(&mut head, 8); // lowestRecPPEM
    push_i16(&mut head, 2); // fontDirectionHint
    push_i16(&mut head, 1); // indexToLocFormat: long
    push_i16(&mut head, 0); // glyphDataFormat

    // maxp (version 0.5)
    let mut maxp = vec![];
    push32(&mut maxp, 0x0000_5000);
    push16(&mut maxp, num_glyphs);

    // hhea
    let mut hhea = vec![];
    push32(&mut hhea, 0x0001_0000);
    push_i16(&mut hhea, 800); // ascender
    push_i16(&mut hhea, -200); // descender
    push_i16(&mut hhea, 50); // lineGap
    push16(&mut hhea, 600); // advanceWidthMax
    for _ in 0..11 {
        push_i16(&mut hhea, 0);
    }
    push16(&mut hhea, num_glyphs); // numberOfHMetrics

    // hmtx
    let mut hmtx = vec![];
    for _ in 0..num_glyphs {
        push16(&mut hmtx, 600);
        push_i16(&mut hmtx, 0);
    }

    let cmap = cmap_table(mappings);

    let tables: Vec<(&[u8; 4], Vec<u8>)> = vec![
        (b"cmap", cmap),
        (b"glyf", glyf),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"loca", loca_table),
        (b"maxp", maxp),
    ];

    // sfnt header + table directory.
    let mut font = vec![];
    push32(&mut font, 0x0001_0000);
    push16(&mut font, tables.len() as u16);
    push16(&mut font, 0); // searchRange
    push16(&mut font, 0); // entrySelector
    push16(&mut font, 0); // rangeShift

    let mut offset = 12 + tables.len() * 16;
    let mut directory = vec![];
    let mut bodies = vec![];

    for (tag, body) in &tables {
        directory.extend_from_slice(*tag);
        push32(&mut directory, 0); // checksum, unchecked
        push32(&mut directory, offset as u32);
        push32(&mut directory, body.len() as u32);

        offset += body.len();
        bodies.extend_from_slice(body);
    }

    font.extend_from_slice(&directory);
    font.extend_from_slice(&bodies);

    font
}
