//! Flat-file artifacts: the id list and the review table.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{HarvestError, Result};
use crate::review::MovieReviews;

fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| HarvestError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Writes one id per line, replacing any existing file.
pub fn write_movie_ids(path: impl AsRef<Path>, movie_ids: &[i64]) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;

    let file = fs::File::create(path).map_err(|e| HarvestError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for id in movie_ids {
        writeln!(writer, "{id}").map_err(|e| HarvestError::io(path, e))?;
    }
    writer.flush().map_err(|e| HarvestError::io(path, e))?;

    info!(count = movie_ids.len(), path = %path.display(), "wrote movie ids");
    Ok(())
}

/// Reads an id file. Blank lines are skipped; anything else that is not an
/// integer is an error.
pub fn read_movie_ids(path: impl AsRef<Path>) -> Result<Vec<i64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;

    text.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, value)| {
            value.parse::<i64>().map_err(|_| HarvestError::InvalidMovieId {
                path: path.to_path_buf(),
                line,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Columns of the review table after `movie_id` and `review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumns {
    pub rating: bool,
    pub status: bool,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            rating: true,
            status: false,
        }
    }
}

impl TableColumns {
    fn header(&self) -> Vec<&'static str> {
        let mut header = vec!["movie_id", "review"];
        if self.rating {
            header.push("rating");
        }
        if self.status {
            header.push("status");
        }
        header
    }
}

/// Flattens the per-movie reviews into one row each and writes them as CSV,
/// replacing any existing file. Returns the number of rows written.
pub fn write_reviews_csv(
    path: impl AsRef<Path>,
    reviews: &BTreeMap<i64, MovieReviews>,
    columns: TableColumns,
) -> Result<usize> {
    let path = path.as_ref();
    create_parent_dir(path)?;

    let mut csv_writer = csv::Writer::from_path(path)?;
    csv_writer.write_record(columns.header())?;

    let mut rows = 0;
    for (movie_id, movie) in reviews {
        for review in &movie.reviews {
            let mut record = vec![movie_id.to_string(), review.content.clone()];
            if columns.rating {
                record.push(review.rating_text());
            }
            if columns.status {
                record.push(movie.status.to_string());
            }
            csv_writer.write_record(&record)?;
            rows += 1;
        }
    }

    csv_writer.flush().map_err(|e| HarvestError::io(path, e))?;

    info!(rows, path = %path.display(), "saved reviews");
    Ok(rows)
}
