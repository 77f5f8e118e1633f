use crate::extent::Extent;

/// Size of the full raster covering `extent`. (width, height)
pub fn get_raster_size(extent: &Extent, res: f64) -> (usize, usize) {
    let width: usize = (extent.width() / res).ceil() as usize;
    let height: usize = (extent.height() / res).ceil() as usize;

    (width, height)
}

/// Size of a single tile raster: one pixel per grid node, edges included. (width, height)
pub fn get_tile_size(bounds: &Extent, res: f64) -> (usize, usize) {
    let width: usize = (bounds.width() / res).floor() as usize + 1;
    let height: usize = (bounds.height() / res).floor() as usize + 1;

    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_size_rounds_up() {
        let e = Extent::from_bounds(0.0, 10.5, 0.0, 4.0);
        assert_eq!(get_raster_size(&e, 1.0), (11, 4));
        assert_eq!(get_raster_size(&e, 0.5), (21, 8));
    }

    #[test]
    fn tile_size_includes_edges() {
        let e = Extent::from_bounds(0.0, 10.5, 0.0, 4.0);
        assert_eq!(get_tile_size(&e, 1.0), (11, 5));
        assert_eq!(get_tile_size(&Extent::from_bounds(3.0, 3.0, 1.0, 1.0), 0.1), (1, 1));
    }
}
