use crate::calc::record::{
    AssessmentComponent, AssessmentRecord, Comprehensive, RecordKey, Semester, SubjectCategory,
};
use crate::calc::summary::SubjectMeta;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

/// Everything the engine needs from persistence. Callers serialize writes
/// per record key; the engine itself holds no locks.
pub trait RecordStore {
    fn get_record(&self, key: &RecordKey) -> anyhow::Result<Option<AssessmentRecord>>;
    fn put_record(&self, record: &AssessmentRecord) -> anyhow::Result<()>;
    fn class_records(
        &self,
        class_id: &str,
        academic_year: &str,
    ) -> anyhow::Result<Vec<AssessmentRecord>>;
    fn subjects(&self) -> anyhow::Result<Vec<SubjectMeta>>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

type RecordRow = (
    String,
    String,
    String,
    String,
    i64,
    String,
    String,
    Option<f64>,
    f64,
);

fn row_to_record(row: RecordRow) -> anyhow::Result<AssessmentRecord> {
    let (
        student_id,
        subject_id,
        class_id,
        academic_year,
        semester,
        formative_json,
        integrated_json,
        ca_score,
        ca_max,
    ) = row;
    let semester = Semester::from_number(semester)
        .ok_or_else(|| anyhow::anyhow!("stored semester out of range: {}", semester))?;
    let formative: Vec<AssessmentComponent> = serde_json::from_str(&formative_json)?;
    let integrated: Vec<AssessmentComponent> = serde_json::from_str(&integrated_json)?;
    Ok(AssessmentRecord {
        key: RecordKey {
            student_id,
            subject_id,
            class_id,
            academic_year,
            semester,
        },
        formative,
        integrated,
        comprehensive: Comprehensive {
            score: ca_score,
            max_score: ca_max,
        },
    })
}

fn read_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
    ))
}

const RECORD_COLUMNS: &str = "student_id, subject_id, class_id, academic_year, semester,
     formative_json, integrated_json, comprehensive_score, comprehensive_max";

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert_subject(&self, subject: &SubjectMeta) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO subjects(id, name, category, credits, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               category = excluded.category,
               credits = excluded.credits,
               updated_at = excluded.updated_at",
            (
                &subject.id,
                &subject.name,
                subject.category.as_str(),
                subject.credits,
                chrono::Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(())
    }
}

impl RecordStore for SqliteStore<'_> {
    fn get_record(&self, key: &RecordKey) -> anyhow::Result<Option<AssessmentRecord>> {
        let sql = format!(
            "SELECT {} FROM assessment_records
             WHERE student_id = ? AND subject_id = ? AND class_id = ?
               AND academic_year = ? AND semester = ?",
            RECORD_COLUMNS
        );
        let row = self
            .conn
            .query_row(
                &sql,
                (
                    &key.student_id,
                    &key.subject_id,
                    &key.class_id,
                    &key.academic_year,
                    key.semester.number(),
                ),
                read_row,
            )
            .optional()?;
        row.map(row_to_record).transpose()
    }

    fn put_record(&self, record: &AssessmentRecord) -> anyhow::Result<()> {
        let formative_json = serde_json::to_string(&record.formative)?;
        let integrated_json = serde_json::to_string(&record.integrated)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO assessment_records(
               id, student_id, subject_id, class_id, academic_year, semester,
               formative_json, integrated_json, comprehensive_score, comprehensive_max, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, subject_id, class_id, academic_year, semester) DO UPDATE SET
               formative_json = excluded.formative_json,
               integrated_json = excluded.integrated_json,
               comprehensive_score = excluded.comprehensive_score,
               comprehensive_max = excluded.comprehensive_max,
               updated_at = excluded.updated_at",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                record.key.student_id,
                record.key.subject_id,
                record.key.class_id,
                record.key.academic_year,
                record.key.semester.number(),
                formative_json,
                integrated_json,
                record.comprehensive.score,
                record.comprehensive.max_score,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn class_records(
        &self,
        class_id: &str,
        academic_year: &str,
    ) -> anyhow::Result<Vec<AssessmentRecord>> {
        let sql = format!(
            "SELECT {} FROM assessment_records
             WHERE class_id = ? AND academic_year = ?
             ORDER BY student_id, subject_id, semester",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map((class_id, academic_year), read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(row_to_record).collect()
    }

    fn subjects(&self) -> anyhow::Result<Vec<SubjectMeta>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, category, credits FROM subjects ORDER BY name, id")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(id, name, category, credits)| SubjectMeta {
                id,
                name,
                category: SubjectCategory::parse(&category)
                    .unwrap_or(SubjectCategory::Complementary),
                credits,
            })
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn sample(semester: Semester) -> AssessmentRecord {
        AssessmentRecord {
            key: RecordKey {
                student_id: "s1".into(),
                subject_id: "math".into(),
                class_id: "c1".into(),
                academic_year: "2024-2025".into(),
                semester,
            },
            formative: vec![AssessmentComponent {
                label: "Quiz".into(),
                max_score: 20.0,
                score: Some(17.5),
            }],
            integrated: vec![AssessmentComponent {
                label: "Project".into(),
                max_score: 50.0,
                score: None,
            }],
            comprehensive: Comprehensive {
                score: None,
                max_score: 100.0,
            },
        }
    }

    #[test]
    fn sqlite_store_round_trips_and_upserts() {
        let ws = temp_dir("assessd-store");
        let conn = db::open_db(&ws).expect("open db");
        let store = SqliteStore::new(&conn);

        let mut r = sample(Semester::Second);
        assert!(store.get_record(&r.key).expect("get").is_none());
        store.put_record(&r).expect("insert");
        assert_eq!(store.get_record(&r.key).expect("get"), Some(r.clone()));

        r.comprehensive.score = Some(64.0);
        store.put_record(&r).expect("update");
        assert_eq!(store.get_record(&r.key).expect("get"), Some(r.clone()));

        store.put_record(&sample(Semester::First)).expect("insert s1");
        let all = store.class_records("c1", "2024-2025").expect("list");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key.semester, Semester::First);
        assert!(store.class_records("c1", "2023-2024").expect("list").is_empty());
    }

    #[test]
    fn sqlite_store_subjects() {
        let ws = temp_dir("assessd-store-subjects");
        let conn = db::open_db(&ws).expect("open db");
        let store = SqliteStore::new(&conn);
        let mut math = SubjectMeta {
            id: "math".into(),
            name: "Mathematics".into(),
            category: SubjectCategory::CoreSpecific,
            credits: 4.0,
        };
        store.upsert_subject(&math).expect("insert");
        math.credits = 5.0;
        store.upsert_subject(&math).expect("update");
        assert_eq!(store.subjects().expect("list"), vec![math]);
    }
}
