//! 견적 이력(pricing history) CSV 원장.
//!
//! 기존 행은 절대 다시 쓰지 않는다. 추가는 배타 잠금을 건 뒤 파일 끝에 한 행만 기록한다.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Timelike};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 저장소 헤더. 모든 행이 이 스키마를 따른다.
pub const HEADER: [&str; 4] = [
    "Customer Name",
    "Machine Type",
    "Estimated Price",
    "Time Logged In",
];

/// 기록 시각 표기 형식.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 기본 저장 파일 이름.
pub const DEFAULT_LEDGER_FILE: &str = "pricing_history.csv";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 원장 입출력 오류.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("pricing history {path} could not be {action}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: BoxError,
    },
}

/// 견적 1건.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationEvent {
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Machine Type")]
    pub machine_type: String,
    #[serde(rename = "Estimated Price")]
    pub estimated_price: f64,
    #[serde(rename = "Time Logged In", with = "timestamp")]
    pub time_logged_in: NaiveDateTime,
}

impl EstimationEvent {
    pub fn new(
        customer_name: impl Into<String>,
        machine_type: impl Into<String>,
        estimated_price: f64,
        time_logged_in: NaiveDateTime,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            machine_type: machine_type.into(),
            estimated_price,
            // 저장 형식이 초 단위라 미리 잘라 둔다.
            time_logged_in: time_logged_in.with_nanosecond(0).unwrap_or(time_logged_in),
        }
    }

    /// 현재 지역 시각으로 기록한다.
    pub fn now(customer_name: impl Into<String>, machine_type: impl Into<String>, price: f64) -> Self {
        Self::new(customer_name, machine_type, price, Local::now().naive_local())
    }

    pub fn timestamp_string(&self) -> String {
        self.time_logged_in.format(TIMESTAMP_FORMAT).to_string()
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// 잠금을 쥐고 있다가 drop 시 해제한다. 쓰기 도중 실패해도 해제된다.
struct LockGuard<'a>(&'a File);

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.0) {
            warn!("failed to unlock pricing history: {e}");
        }
    }
}

/// CSV 파일 하나에 대응하는 추가 전용 원장.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
}

impl HistoryLedger {
    /// 경로만 기억한다. 파일은 첫 추가 때 생성된다.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, action: &'static str, source: impl Into<BoxError>) -> LedgerError {
        LedgerError::PersistenceFailure {
            path: self.path.clone(),
            action,
            source: source.into(),
        }
    }

    /// 견적 1건을 파일 끝에 추가한다.
    pub fn append(&self, event: &EstimationEvent) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.failure("created", e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.failure("opened", e))?;
        file.lock_exclusive().map_err(|e| self.failure("locked", e))?;
        let _guard = LockGuard(&file);

        let len = file
            .metadata()
            .map_err(|e| self.failure("inspected", e))?
            .len();
        if len > 0 {
            self.check_header(&file)?;
            if !ends_with_newline(&file).map_err(|e| self.failure("read", e))? {
                (&file)
                    .write_all(b"\n")
                    .map_err(|e| self.failure("written", e))?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&file);
        if len == 0 {
            writer
                .write_record(HEADER)
                .map_err(|e| self.failure("written", e))?;
        }
        writer
            .serialize(event)
            .map_err(|e| self.failure("written", e))?;
        writer.flush().map_err(|e| self.failure("written", e))?;
        drop(writer);
        file.sync_all().map_err(|e| self.failure("synced", e))?;

        info!(
            path = %self.path.display(),
            machine = %event.machine_type,
            price = event.estimated_price,
            "estimate logged"
        );
        Ok(())
    }

    /// 저장 파일 자체가 있으면 true. 내려받기 가능 여부에 쓴다.
    pub fn has_file(&self) -> bool {
        self.path.is_file()
    }

    /// 이전에 추가된 행이 하나라도 있으면 true.
    pub fn exists(&self) -> bool {
        if !self.path.is_file() {
            return false;
        }
        match self.reader() {
            Ok(mut reader) => {
                let mut record = csv::StringRecord::new();
                matches!(reader.read_record(&mut record), Ok(true))
            }
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    /// 추가된 순서대로 모든 견적을 읽는다. 파일이 없으면 빈 목록.
    pub fn read_all(&self) -> Result<Vec<EstimationEvent>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = self.reader()?;
        reader
            .deserialize::<EstimationEvent>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.failure("read", e))
    }

    /// 저장 파일을 그대로 dest에 복사한다(이력 내려받기).
    pub fn export_to(&self, dest: impl AsRef<Path>) -> Result<u64, LedgerError> {
        let dest = dest.as_ref();
        if !self.has_file() {
            return Err(self.failure(
                "exported",
                format!("{} does not exist yet", self.path.display()),
            ));
        }
        let bytes = fs::copy(&self.path, dest).map_err(|e| self.failure("exported", e))?;
        info!(from = %self.path.display(), to = %dest.display(), bytes, "pricing history exported");
        Ok(bytes)
    }

    /// 헤더를 검증한 리더를 연다.
    fn reader(&self) -> Result<csv::Reader<File>, LedgerError> {
        let file = File::open(&self.path).map_err(|e| self.failure("opened", e))?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers().map_err(|e| self.failure("read", e))?;
        if !header_matches(headers) {
            return Err(self.failure("read", schema_mismatch(headers)));
        }
        Ok(reader)
    }

    fn check_header(&self, file: &File) -> Result<(), LedgerError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers().map_err(|e| self.failure("read", e))?;
        if header_matches(headers) {
            Ok(())
        } else {
            Err(self.failure("appended", schema_mismatch(headers)))
        }
    }
}

fn header_matches(headers: &csv::StringRecord) -> bool {
    headers.len() == HEADER.len() && headers.iter().eq(HEADER)
}

fn schema_mismatch(headers: &csv::StringRecord) -> String {
    format!(
        "unexpected columns [{}], expected [{}]",
        headers.iter().collect::<Vec<_>>().join(", "),
        HEADER.join(", ")
    )
}

fn ends_with_newline(mut file: &File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
