// THEORY:
// The `RegionExtractor` is the spatial grouping stage. It labels the 8-connected
// components of a binary mask and reports each one as a `Region`.
//
// Algorithm:
// 1.  **Raster scan for seeds**: pixels are visited top-to-bottom, left-to-right.
//     The first unvisited "on" pixel of a component becomes its seed, which fixes
//     the output order: components are listed by the raster position of their
//     first pixel, so the same mask always yields the same sequence.
// 2.  **Flood fill**: from each seed, an explicit stack (no recursion, so large
//     blobs cannot overflow the call stack) collects every "on" pixel reachable
//     through the 8 neighbours.
// 3.  **Aggregation**: while filling, the pixel count and the min/max corners are
//     accumulated; no per-component pixel list is kept.
//
// Only the outer extent of each component matters. Holes inside a region are not
// reported as regions of their own.

use crate::core_modules::frame::BinaryMask;
use crate::core_modules::region::{BoundingBox, Region};

pub mod region_extractor {
    use super::*;

    const NEIGHBOURS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Labels every 8-connected component of "on" pixels in `mask`.
    pub fn extract_regions(mask: &BinaryMask) -> Vec<Region> {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let bits = mask.as_slice();

        let mut visited = vec![false; width * height];
        let mut regions = Vec::new();
        let mut stack: Vec<(u32, u32)> = Vec::new();

        for seed in 0..width * height {
            if !bits[seed] || visited[seed] {
                continue;
            }

            visited[seed] = true;
            stack.push(((seed % width) as u32, (seed / width) as u32));

            let mut pixel_count = 0usize;
            let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
            let (mut max_x, mut max_y) = (0u32, 0u32);

            while let Some((x, y)) = stack.pop() {
                pixel_count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for (dx, dy) in NEIGHBOURS {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let index = ny as usize * width + nx as usize;
                    if bits[index] && !visited[index] {
                        visited[index] = true;
                        stack.push((nx as u32, ny as u32));
                    }
                }
            }

            regions.push(Region {
                pixel_count,
                bounding_box: BoundingBox::from_corners(min_x, min_y, max_x, max_y),
            });
        }

        regions
    }

    /// Drops regions whose pixel count is below `min_area`.
    pub fn filter_by_area(regions: Vec<Region>, min_area: usize) -> Vec<Region> {
        regions
            .into_iter()
            .filter(|region| region.pixel_count >= min_area)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::region_extractor::*;
    use super::*;

    fn paint(mask: &mut BinaryMask, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(extract_regions(&BinaryMask::new(8, 8)).is_empty());
    }

    #[test]
    fn separated_blobs_are_two_regions() {
        let mut mask = BinaryMask::new(12, 10);
        paint(&mut mask, 1, 1, 3, 3);
        paint(&mut mask, 6, 5, 4, 2);
        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].pixel_count, 9);
        assert_eq!(regions[0].bounding_box, BoundingBox::from_corners(1, 1, 3, 3));
        assert_eq!(regions[1].pixel_count, 8);
        assert_eq!(
            regions[1].bounding_box,
            BoundingBox {
                x: 6,
                y: 5,
                width: 4,
                height: 2
            }
        );
    }

    #[test]
    fn diagonal_touch_joins_components() {
        let mut mask = BinaryMask::new(4, 4);
        mask.set(0, 0, true);
        mask.set(1, 1, true);
        mask.set(2, 2, true);
        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, 3);
        assert_eq!(regions[0].bounding_box.area(), 9);
    }

    #[test]
    fn ring_with_hole_is_a_single_region() {
        let mask = BinaryMask::from_fn(5, 5, |x, y| x == 0 || y == 0 || x == 4 || y == 4);
        let regions = extract_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count, 16);
        assert_eq!(regions[0].bounding_box, BoundingBox::from_corners(0, 0, 4, 4));
    }

    #[test]
    fn order_follows_first_pixel_in_raster_order() {
        let mut mask = BinaryMask::new(10, 10);
        // A tall blob starting lower but further left than a small one.
        paint(&mut mask, 0, 4, 1, 6);
        paint(&mut mask, 8, 0, 1, 1);
        let regions = extract_regions(&mask);
        assert_eq!(regions[0].bounding_box.x, 8);
        assert_eq!(regions[1].bounding_box.x, 0);
        assert_eq!(extract_regions(&mask), regions);
    }

    #[test]
    fn area_filter_keeps_regions_at_the_limit() {
        let mut mask = BinaryMask::new(10, 3);
        paint(&mut mask, 0, 0, 2, 2);
        paint(&mut mask, 5, 0, 1, 3);
        let kept = filter_by_area(extract_regions(&mask), 4);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].pixel_count, 4);
    }
}
