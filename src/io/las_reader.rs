use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use las::{Header, Reader};

use crate::error::{Error, Result};
use crate::observer::{Event, Observer};
use crate::point_set::PointSet;

use super::keep_point;

const PROJECTION_USER_ID: &str = "LASF_Projection";
const OGC_WKT_RECORD_ID: u16 = 2112;

/// Reads a las/laz file, honouring the classification filter and decimation stride.
pub fn read_las(
    path: &Path,
    class: Option<u8>,
    decimation: usize,
    observer: &dyn Observer,
) -> Result<PointSet> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = Reader::new(BufReader::new(file))?;

    let count = reader.header().number_of_points() as usize;
    if count == 0 {
        return Err(Error::NoPointsFound(path.to_path_buf()));
    }

    observer.event(Event::ReadingPoints {
        path: path.to_path_buf(),
        count,
    });

    let mut points = PointSet::with_capacity(count / decimation.max(1));
    points.srs = wkt_crs(reader.header());
    if let Some(wkt) = &points.srs {
        observer.event(Event::SpatialReference(wkt.clone()));
    }

    for (i, point) in reader.points().enumerate() {
        let point = point?;

        if !keep_point(i, decimation) {
            continue;
        }

        if let Some(class) = class {
            if u8::from(point.classification) != class {
                continue;
            }
        }

        points.push(point.x, point.y, point.z);
    }

    Ok(points)
}

/// OGC WKT coordinate system stored in the (extended) variable length records, if any.
fn wkt_crs(header: &Header) -> Option<String> {
    header
        .vlrs()
        .iter()
        .chain(header.evlrs())
        .find(|vlr| vlr.user_id == PROJECTION_USER_ID && vlr.record_id == OGC_WKT_RECORD_ID)
        .map(|vlr| {
            String::from_utf8_lossy(&vlr.data)
                .trim_end_matches('\0')
                .to_string()
        })
        .filter(|wkt| !wkt.is_empty())
}
