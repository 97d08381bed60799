use std::fs::OpenOptions;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::info;

use crate::error::EtlError;
use crate::model::{COLUMNS, RateRecord};

/// Replaces whatever is at `file_path` with a header line plus one line per row.
pub fn save_to_csv<P: AsRef<Path>>(rows: &[RateRecord], file_path: P) -> Result<(), EtlError> {
    let path = file_path.as_ref();
    info!("Loading data to CSV at {}.", path.display());

    let io_err = |source| EtlError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| EtlError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(io_err)?;

    // Header is written by hand so an empty run still yields a valid file.
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(COLUMNS).map_err(csv_err)?;

    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }

    wtr.flush().map_err(io_err)?;
    info!("CSV saved successfully ({} rows).", rows.len());
    Ok(())
}

pub fn read_csv<P: AsRef<Path>>(file_path: P) -> Result<Vec<RateRecord>, EtlError> {
    let path = file_path.as_ref();
    let csv_err = |source| EtlError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new().from_path(path).map_err(csv_err)?;
    rdr.deserialize().collect::<Result<Vec<RateRecord>, _>>().map_err(csv_err)
}
