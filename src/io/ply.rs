//! Reader for the PLY vertex-list exchange format.
//!
//! Only the vertex element is consumed. The first three vertex properties must be `x`, `y`
//! and `z`; normals, colors, segmentation and view counts are recognised so they can be
//! skipped, everything else in the header is ignored. Binary bodies are read as
//! little-endian records.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::observer::{Event, Observer};
use crate::point_set::PointSet;

use super::keep_point;

const MAGIC: &str = "ply";
const ASCII_FORMAT: &str = "format ascii 1.0";
const END_HEADER: &str = "end_header";
const MAX_HEADER_LINES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlyHeader {
    pub ascii: bool,
    pub count: usize,
    pub normals: bool,
    pub colors: bool,
    pub views: bool,
    pub segmentation: bool,
}

pub fn read_ply(path: &Path, decimation: usize, observer: &dyn Observer) -> Result<PointSet> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let header = read_header(&mut reader)?;
    observer.event(Event::ReadingPoints {
        path: path.to_path_buf(),
        count: header.count,
    });
    observer.event(Event::PlyHeader {
        ascii: header.ascii,
        normals: header.normals,
        colors: header.colors,
        views: header.views,
        segmentation: header.segmentation,
    });

    read_body(reader, &header, decimation)
}

/// Decodes the points following a parsed header, keeping those selected by `decimation`.
pub fn read_body<R: BufRead>(reader: R, header: &PlyHeader, decimation: usize) -> Result<PointSet> {
    let mut points = PointSet::with_capacity(header.count / decimation.max(1));

    if header.ascii {
        let mut tokens = Tokens::new(reader, header.count);

        for i in 0..header.count {
            let x: f64 = tokens.next(i)?;
            let y: f64 = tokens.next(i)?;
            let z: f64 = tokens.next(i)?;

            if header.normals {
                tokens.skip::<f32>(i, 3)?;
            }
            if header.colors {
                tokens.skip::<u16>(i, 3)?;
            }
            if header.segmentation {
                tokens.skip::<f32>(i, 2)?;
            }
            if header.views {
                tokens.skip::<u16>(i, 1)?;
            }

            if keep_point(i, decimation) {
                points.push(x, y, z);
            }
        }
    } else {
        let mut reader = reader;
        let count = header.count;

        for i in 0..count {
            let x = read_f32(&mut reader, i, count)?;
            let y = read_f32(&mut reader, i, count)?;
            let z = read_f32(&mut reader, i, count)?;

            if header.normals {
                read_bytes::<_, 12>(&mut reader, i, count)?;
            }
            if header.colors {
                read_bytes::<_, 3>(&mut reader, i, count)?;
            }
            if header.segmentation {
                // u8 label + f32 confidence
                read_bytes::<_, 5>(&mut reader, i, count)?;
            }
            if header.views {
                read_bytes::<_, 1>(&mut reader, i, count)?;
            }

            if keep_point(i, decimation) {
                points.push(x as f64, y as f64, z as f64);
            }
        }
    }

    Ok(points)
}

pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader> {
    let mut buf = Vec::new();

    let magic = next_line(reader, &mut buf)?.unwrap_or_default();
    if magic != MAGIC {
        return Err(Error::MalformedHeader(format!(
            "header does not start with {MAGIC}"
        )));
    }

    let format = next_line(reader, &mut buf)?
        .ok_or_else(|| Error::MalformedHeader("missing format line".into()))?;

    let mut header = PlyHeader {
        ascii: format == ASCII_FORMAT,
        count: vertex_count(reader, &mut buf)?,
        ..PlyHeader::default()
    };

    for prop in ["x", "y", "z"] {
        let line = next_line(reader, &mut buf)?.unwrap_or_default();
        if !line.ends_with(prop) {
            return Err(Error::MalformedHeader(format!(
                "expected 'property * {prop}', but found '{line}'"
            )));
        }
    }

    let mut scanned = 0;
    loop {
        let line = next_line(reader, &mut buf)?
            .ok_or_else(|| Error::MalformedHeader(format!("missing {END_HEADER}")))?;

        if line == END_HEADER {
            break;
        }

        scanned += 1;
        if scanned > MAX_HEADER_LINES {
            return Err(Error::MalformedHeader(format!(
                "{END_HEADER} not found within {MAX_HEADER_LINES} property lines"
            )));
        }

        if has_property(&line, "nx") || has_property(&line, "normal_x") || has_property(&line, "normalx") {
            header.normals = true;
        }
        if has_property(&line, "red") || has_property(&line, "green") || has_property(&line, "blue") {
            header.colors = true;
        }
        if has_property(&line, "views") {
            header.views = true;
        }
        if has_property(&line, "segmentation") || has_property(&line, "segmentationConfidence") {
            header.segmentation = true;
        }
    }

    Ok(header)
}

fn vertex_count<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
    for _ in 0..MAX_HEADER_LINES {
        let Some(line) = next_line(reader, buf)? else {
            break;
        };

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("comment") => continue,
            Some("element") if tokens.next() == Some("vertex") => {
                return tokens
                    .next()
                    .and_then(|count| count.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::MalformedHeader(format!("invalid vertex count in '{line}'"))
                    });
            }
            _ => {
                return Err(Error::MalformedHeader(format!(
                    "expected 'element vertex <count>', but found '{line}'"
                )))
            }
        }
    }

    Err(Error::MalformedHeader("no vertex element declared".into()))
}

fn has_property(line: &str, prop: &str) -> bool {
    line.starts_with("property") && line.ends_with(prop)
}

/// Reads one header line, dropping the line terminator (and any stray `\r`).
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(buf).replace(['\r', '\n'], "")))
}

fn read_bytes<R: Read, const N: usize>(reader: &mut R, index: usize, count: usize) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::TruncatedData(format!(
            "expected {count} points, data ends at point {index}"
        )),
        _ => Error::Io(e),
    })?;

    Ok(bytes)
}

fn read_f32<R: Read>(reader: &mut R, index: usize, count: usize) -> Result<f32> {
    Ok(f32::from_le_bytes(read_bytes(reader, index, count)?))
}

/// Whitespace separated tokens of an ascii body, regardless of line breaks.
struct Tokens<R> {
    reader: R,
    line: String,
    pos: usize,
    count: usize,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R, count: usize) -> Self {
        Self {
            reader,
            line: String::new(),
            pos: 0,
            count,
        }
    }

    fn next<T: FromStr>(&mut self, index: usize) -> Result<T> {
        loop {
            let rest = &self.line[self.pos..];
            let trimmed = rest.trim_start();

            if !trimmed.is_empty() {
                let start = self.pos + (rest.len() - trimmed.len());
                let len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
                self.pos = start + len;

                let token = &self.line[start..self.pos];
                return token.parse().map_err(|_| {
                    Error::InvalidValue(format!("'{token}' at point {index}"))
                });
            }

            self.line.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(Error::TruncatedData(format!(
                    "expected {} points, data ends at point {index}",
                    self.count
                )));
            }
        }
    }

    fn skip<T: FromStr>(&mut self, index: usize, n: usize) -> Result<()> {
        for _ in 0..n {
            self.next::<T>(index)?;
        }

        Ok(())
    }
}
