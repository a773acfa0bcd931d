// ! Minimal XLSX writer: one worksheet of inline strings and numbers

use crate::reader::{CellRef, CellValue};
use anyhow::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// Write `rows` as the single worksheet `sheet_name` of a new workbook
pub fn write_grid_xlsx(sheet_name: &str, rows: &[Vec<CellValue>]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(&workbook_xml(sheet_name)?)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(&sheet_xml(rows)?)?;

    Ok(zip.finish()?.into_inner())
}

fn xml_writer() -> Result<Writer<Cursor<Vec<u8>>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>> {
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(
        BytesStart::new("workbook").with_attributes([("xmlns", MAIN_NS), ("xmlns:r", REL_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    writer.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
        ("name", sheet_name),
        ("sheetId", "1"),
        ("r:id", "rId1"),
    ])))?;
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner().into_inner())
}

fn sheet_xml(rows: &[Vec<CellValue>]) -> Result<Vec<u8>> {
    let mut writer = xml_writer()?;
    writer.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", MAIN_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = (row_idx + 1).to_string();
        writer.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_number.as_str())]),
        ))?;
        for (col_idx, value) in row.iter().enumerate() {
            let reference = CellRef::new(row_idx as u32, col_idx as u32).to_excel_ref();
            write_cell(&mut writer, &reference, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_cell(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    reference: &str,
    value: &CellValue,
) -> Result<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            writer.write_event(Event::Start(
                BytesStart::new("c").with_attributes([("r", reference)]),
            ))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&n.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        // Dates are written as day-first text
        CellValue::Text(_) | CellValue::Date(_) => {
            let text = value.to_string();
            writer.write_event(Event::Start(
                BytesStart::new("c").with_attributes([("r", reference), ("t", "inlineStr")]),
            ))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(
                BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_layout() {
        let bytes = write_grid_xlsx("Ítems", &[vec![CellValue::text("a")]]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<_> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );
        assert!(read_entry(&bytes, "xl/workbook.xml").contains(r#"name="Ítems""#));
    }

    #[test]
    fn test_cells_are_escaped_and_typed() {
        let rows = vec![vec![
            CellValue::text("<Planta & Co>"),
            CellValue::Empty,
            CellValue::Number(2.5),
        ]];
        let sheet = read_entry(&write_grid_xlsx("S", &rows).unwrap(), "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("&lt;Planta &amp; Co&gt;"));
        assert!(sheet.contains(r#"<c r="C1"><v>2.5</v></c>"#));
        assert!(!sheet.contains(r#"r="B1""#));
    }
}
