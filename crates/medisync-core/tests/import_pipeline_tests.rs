//! End-to-end import tests against a real SQLite store.

use medisync_core::models::UploadStatus;
use medisync_core::parser::decode;
use medisync_core::{
    Cell, Database, FileImport, ImportConfig, ImportError, Importer, ManualImport, ManualOutcome,
    UploadedFile,
};
use rust_xlsxwriter::Workbook;

const REPORT: &str = "\
Republic of the Philippines
San Isidro Health Center
August-25
Health Center, Medicine, Unit, Beg, Del, Disp, End
1,Paracetamol 500mg Tablet,tablet,100,50,30,120
2,Amoxicillin 500mg Capsule,capsule,\"1,200\",0,200,\"1,000\"
3,PARACETAMOL 500 mg,tablet,5,5,5,5
4,Ascorbic Acid 500mg,tablet,0,0,0,0
TOTAL,,,,,,
";

fn csv(name: &str, contents: &str) -> Option<UploadedFile> {
    Some(UploadedFile {
        filename: name.into(),
        content_type: "text/csv".into(),
        bytes: contents.as_bytes().to_vec(),
    })
}

/// Two-sheet workbook: a cover sheet with the banner and month, then the
/// stock card with numeric quantity cells.
fn stock_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();

    let cover = workbook.add_worksheet();
    cover.set_name("Cover").unwrap();
    cover.write_string(0, 0, "San Isidro Health Center").unwrap();
    cover.write_string(1, 0, "August-25").unwrap();

    let stock = workbook.add_worksheet();
    stock.set_name("Stock").unwrap();
    let header = ["No.", "Medicine", "Unit", "Beginning", "Delivery", "Dispensed", "Ending"];
    for (col, title) in header.iter().enumerate() {
        stock.write_string(0, col as u16, *title).unwrap();
    }
    let lines: [(&str, [f64; 4]); 3] = [
        ("Paracetamol 500mg Tablet", [100.0, 50.0, 30.0, 120.0]),
        ("Zinc Sulfate 20mg Tablet", [0.0, 40.0, 10.0, 30.0]),
        ("Ascorbic Acid 500mg", [0.0, 0.0, 0.0, 0.0]),
    ];
    for (index, (name, quantities)) in lines.iter().enumerate() {
        let row = index as u32 + 1;
        stock.write_number(row, 0, row as f64).unwrap();
        stock.write_string(row, 1, *name).unwrap();
        stock.write_string(row, 2, "tablet").unwrap();
        for (offset, quantity) in quantities.iter().enumerate() {
            stock.write_number(row, 3 + offset as u16, *quantity).unwrap();
        }
    }

    workbook.save_to_buffer().unwrap()
}

fn upload_count(db: &Database) -> i64 {
    db.conn()
        .query_row("SELECT COUNT(*) FROM uploads", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_csv_report_is_persisted() {
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db);

    let summary = importer
        .import_file(FileImport {
            file: csv("san_isidro_aug.csv", REPORT),
            month: "August".into(),
            year: "2025".into(),
        })
        .unwrap();

    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.total_rows, 9);
    assert_eq!(summary.unique_medicines, Some(2));
    assert_eq!(summary.health_center, "Health Center");
    assert_eq!(summary.month, "2025-08");

    let upload = db.get_upload(&summary.upload_id).unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Completed);
    assert_eq!(upload.row_count, 9);
    assert_eq!(upload.processed_count, 2);
    assert_eq!(upload.filename, "san_isidro_aug.csv");

    let records = db.list_inventory(Some("2025-08")).unwrap();
    assert_eq!(records.len(), 2);

    let amoxicillin = &records[0];
    assert_eq!(amoxicillin.medicine_base_name, "Amoxicillin");
    assert_eq!(amoxicillin.beginning_balance, 1200);
    assert_eq!(amoxicillin.ending_balance, 1000);

    let paracetamol = &records[1];
    assert_eq!(paracetamol.medicine_base_name, "Paracetamol");
    assert_eq!(paracetamol.dosage, "500mg");
    assert_eq!(paracetamol.unit_type, "tablet");
    assert_eq!(paracetamol.dispensed, 30);

    let series = db.list_timeseries(Some("Paracetamol")).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].total_ending_balance, 120);
}

#[test]
fn test_unsupported_format_creates_no_upload() {
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db);

    let err = importer
        .import_file(FileImport {
            file: csv("report.pdf", "%PDF-1.4"),
            month: "August".into(),
            year: "2025".into(),
        })
        .unwrap_err();

    assert!(matches!(err, ImportError::Decode(_)));
    assert_eq!(upload_count(&db), 0);
}

#[test]
fn test_manual_entry_is_persisted_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medisync.db");

    let upload_id = {
        let db = Database::open(&path).unwrap();
        let importer = Importer::new(&db);

        let outcome = importer
            .import_manual(ManualImport {
                file: Some(UploadedFile {
                    filename: "slip.jpg".into(),
                    content_type: "image/jpeg".into(),
                    bytes: vec![0xff, 0xd8, 0xff],
                }),
                month: "September".into(),
                year: "2025".into(),
                records: Some(
                    r#"[{"medicine_name": "Losartan 50mg Tablet", "quantity_issued": 30, "unit_cost": 1.5, "expiration_date": "Dec-27"}]"#
                        .into(),
                ),
            })
            .unwrap();

        match outcome {
            ManualOutcome::Imported(summary) => summary.upload_id,
            other => panic!("unexpected outcome: {:?}", other),
        }
    };

    let db = Database::open(&path).unwrap();
    let upload = db.get_upload(&upload_id).unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Completed);
    assert_eq!(upload.month, "2025-09");

    let records = db.list_inventory(Some("2025-09")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].medicine_base_name, "Losartan");
    assert_eq!(records[0].dispensed, 30);
    assert_eq!(records[0].total_amount, 45.0);
    assert_eq!(
        records[0].expiration_date.map(|d| d.to_string()).as_deref(),
        Some("2027-12-01")
    );
}

#[test]
fn test_reimport_appends_new_upload() {
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db);

    let request = || FileImport {
        file: csv("stock.csv", REPORT),
        month: "August".into(),
        year: "2025".into(),
    };

    let first = importer.import_file(request()).unwrap();
    let second = importer.import_file(request()).unwrap();

    assert_ne!(first.upload_id, second.upload_id);
    assert_eq!(upload_count(&db), 2);
    assert_eq!(db.list_inventory(None).unwrap().len(), 4);
}

#[test]
fn test_workbook_sheets_are_flattened_with_separator() {
    let grid = decode(&stock_workbook(), "stock.xlsx").unwrap();
    let rows = grid.rows();

    // cover (2) + separator (1) + stock card (4)
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0], vec![Cell::Text("San Isidro Health Center".into())]);
    assert_eq!(rows[1], vec![Cell::Text("August-25".into())]);
    assert!(rows[2].is_empty());
    assert_eq!(rows[3][1], Cell::Text("Medicine".into()));
    assert_eq!(rows[4][0], Cell::Number(1.0));
    assert_eq!(rows[4][1], Cell::Text("Paracetamol 500mg Tablet".into()));
    assert_eq!(rows[4][3], Cell::Number(100.0));
    assert_eq!(rows[4][6], Cell::Number(120.0));
}

#[test]
fn test_workbook_report_is_persisted() {
    let db = Database::open_in_memory().unwrap();
    let importer = Importer::new(&db);

    let summary = importer
        .import_file(FileImport {
            file: Some(UploadedFile {
                filename: "stock.xlsx".into(),
                content_type:
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".into(),
                bytes: stock_workbook(),
            }),
            month: "August".into(),
            year: "2025".into(),
        })
        .unwrap();

    assert_eq!(summary.processed_rows, 2);
    assert_eq!(summary.total_rows, 7);
    assert_eq!(summary.health_center, "San Isidro Health Center");

    let records = db.list_upload_inventory(&summary.upload_id).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.medicine_base_name.as_str()).collect();
    assert_eq!(names, vec!["Paracetamol", "Zinc Sulfate"]);
    assert_eq!(records[0].beginning_balance, 100);
    assert_eq!(records[0].ending_balance, 120);
    assert_eq!(records[1].dosage, "20mg");
    assert_eq!(records[1].delivery, 40);
}

#[test]
fn test_failed_chunk_keeps_committed_rows_traceable() {
    let db = Database::open_in_memory().unwrap();
    db.conn()
        .execute_batch(
            "CREATE TRIGGER reject_amoxicillin BEFORE INSERT ON medicine_inventory
             WHEN NEW.medicine_base_name = 'Amoxicillin'
             BEGIN SELECT RAISE(ABORT, 'amoxicillin rejected'); END;",
        )
        .unwrap();
    let config = ImportConfig {
        batch_size: 1,
        ..ImportConfig::default()
    };
    let importer = Importer::with_config(&db, config).unwrap();

    let err = importer
        .import_file(FileImport {
            file: csv("stock.csv", REPORT),
            month: "August".into(),
            year: "2025".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ImportError::InsertRecords(_)));

    let upload_id: String = db
        .conn()
        .query_row("SELECT id FROM uploads", [], |row| row.get(0))
        .unwrap();
    let upload = db.get_upload(&upload_id).unwrap().unwrap();
    assert_eq!(upload.status, UploadStatus::Failed);

    // the Paracetamol chunk committed before the failure and carries the id
    let committed = db.list_upload_inventory(&upload_id).unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].medicine_base_name, "Paracetamol");

    let tagged: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM medicine_inventory WHERE upload_id = ?1",
            [&upload_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tagged, 1);
}
