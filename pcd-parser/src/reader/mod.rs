pub mod ply;

use pcd_core::Point;

use crate::error::ParseError;

pub trait PointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError>;
}

/// Adapts a [`PointReader`] into an iterator of points.
///
/// The first error is yielded and ends the iteration.
pub struct PointIterator<R: PointReader> {
    reader: R,
    done: bool,
}

impl<R: PointReader> PointIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: PointReader> Iterator for PointIterator<R> {
    type Item = Result<Point, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_point() {
            Ok(Some(p)) => Some(Ok(p)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
