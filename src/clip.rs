//! Intersects polygons with an axis-aligned rectangle.
//!
//! A single pass of half-plane clipping can only ever produce one contour, which silently glues
//! together pieces of a concave polygon that the rectangle separates. Instead, this walks the
//! subject's boundary to find every run that's inside the rectangle, then stitches those runs
//! together by following the rectangle's boundary, in the style of Weiler-Atherton. Each closed
//! loop of runs becomes its own output polygon.

use geo::{Area, Contains, Coord, LineString, Point, Polygon, Rect};
use log::debug;

use crate::assemble::assemble;
use crate::geometry::{open_coords, EPSILON};

/// Returns the pieces of the polygon's exterior that fall inside the rectangle. The polygon should
/// already be simple (see `repair`). Output polygons keep the subject's winding order, and pieces
/// with no area are discarded.
pub fn clip(polygon: &Polygon, rect: &Rect) -> Vec<Polygon> {
    let window = Window::new(rect);
    if window.width() <= EPSILON || window.height() <= EPSILON {
        return Vec::new();
    }
    let pts = open_coords(polygon.exterior());
    if pts.len() < 3 {
        return Vec::new();
    }

    assemble(clip_contour(&pts, &window))
        .into_iter()
        .filter(|polygon| !is_sliver(polygon))
        .collect()
}

fn clip_contour(pts: &[Coord], window: &Window) -> Vec<Vec<Coord>> {
    let ccw = Polygon::new(LineString::new(pts.to_vec()), Vec::new()).signed_area() >= 0.0;
    let mut ring: Vec<Coord> = pts.iter().map(|pt| window.snap(*pt)).collect();
    if !ccw {
        ring.reverse();
    }

    // Start the walk outside the window, so every chain has a real entry and exit
    let Some(start) = ring.iter().position(|pt| !window.contains(*pt)) else {
        return vec![pts.iter().map(|pt| window.clamp(*pt)).collect()];
    };
    ring.rotate_left(start);

    let chains: Vec<Chain> = trace_chains(&ring, window)
        .into_iter()
        .filter(|chain| !window.runs_along_boundary(&chain.points))
        .collect();

    let stitched = if chains.is_empty() {
        // The subject's boundary never passes through the window, so the window is either
        // entirely inside the subject or entirely outside it.
        let subject = Polygon::new(LineString::new(ring), Vec::new());
        if subject.contains(&Point::from(window.center())) {
            vec![window.corners().map(|(pt, _)| pt).to_vec()]
        } else {
            return Vec::new();
        }
    } else {
        debug!("Stitching {} chains crossing the window", chains.len());
        stitch(&chains, window)
    };

    let mut contours = Vec::new();
    for contour in stitched {
        let noded = merge_close_points(node_boundary_touches(&contour, window));
        contours.extend(
            split_at_touches(noded, window)
                .into_iter()
                .map(remove_spikes),
        );
    }
    for contour in &mut contours {
        if !ccw {
            contour.reverse();
        }
        rotate_to_lowest(contour);
    }
    contours
}

/// A maximal run of the subject's boundary inside the window. It enters and leaves through the
/// window's boundary, at the given perimeter positions.
struct Chain {
    points: Vec<Coord>,
    entry: f64,
    exit: f64,
}

/// The ring must be counter-clockwise, start outside the window, and already be snapped to it.
fn trace_chains(ring: &[Coord], window: &Window) -> Vec<Chain> {
    let mut chains = Vec::new();
    let mut current: Vec<Coord> = Vec::new();

    for (idx, a) in ring.iter().enumerate() {
        let b = ring[(idx + 1) % ring.len()];
        let Some(span) = window.clip_segment(*a, b) else {
            continue;
        };

        if !current.is_empty() && span.enters {
            chains.push(Chain::new(std::mem::take(&mut current), window));
        }
        if current.is_empty() {
            current.push(span.start);
        }
        current.push(span.end);
        if span.leaves {
            chains.push(Chain::new(std::mem::take(&mut current), window));
        }
    }
    if !current.is_empty() {
        chains.push(Chain::new(current, window));
    }
    chains
}

impl Chain {
    fn new(points: Vec<Coord>, window: &Window) -> Self {
        let entry = window.perimeter_position(points[0]);
        let exit = window.perimeter_position(points[points.len() - 1]);
        Self {
            points,
            entry,
            exit,
        }
    }
}

/// Links chains into closed contours. After leaving through some exit point, the intersection's
/// boundary follows the window counter-clockwise until the subject re-enters.
fn stitch(chains: &[Chain], window: &Window) -> Vec<Vec<Coord>> {
    let mut used = vec![false; chains.len()];
    let mut contours = Vec::new();

    for start in 0..chains.len() {
        if used[start] {
            continue;
        }
        let mut contour = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            let exit = chains[current].exit;
            contour.extend_from_slice(&chains[current].points);

            let next = (0..chains.len())
                .filter(|idx| *idx == start || !used[*idx])
                .min_by(|a, b| {
                    window
                        .walk_distance(exit, chains[*a].entry)
                        .total_cmp(&window.walk_distance(exit, chains[*b].entry))
                })
                .unwrap_or(start);
            contour.extend(window.corners_between(exit, chains[next].entry));

            if next == start {
                break;
            }
            current = next;
        }
        contours.push(contour);
    }
    contours
}

/// The subject can touch the window's boundary at a vertex while the stitched walk passes over
/// the same spot. Inserts those vertices into the boundary edges they lie on, so the touch shows
/// up as a repeated vertex.
fn node_boundary_touches(contour: &[Coord], window: &Window) -> Vec<Coord> {
    let touching: Vec<Coord> = contour
        .iter()
        .copied()
        .filter(|pt| window.on_boundary(*pt))
        .collect();
    let mut noded = Vec::with_capacity(contour.len());
    for (idx, a) in contour.iter().enumerate() {
        let b = contour[(idx + 1) % contour.len()];
        noded.push(*a);
        if !window.on_boundary(*a) || !window.on_boundary(b) {
            continue;
        }
        let mut between: Vec<(f64, Coord)> = touching
            .iter()
            .filter_map(|pt| interior_parameter(*a, b, *pt).map(|t| (t, *pt)))
            .collect();
        between.sort_by(|x, y| x.0.total_cmp(&y.0));
        noded.extend(between.into_iter().map(|(_, pt)| pt));
    }
    noded
}

/// Where `pt` falls along the segment, if it's on the segment and not at either end
fn interior_parameter(a: Coord, b: Coord, pt: Coord) -> Option<f64> {
    let d = b - a;
    let len = d.x.hypot(d.y);
    if len <= EPSILON {
        return None;
    }
    let rel = pt - a;
    if (d.x * rel.y - d.y * rel.x).abs() / len > EPSILON {
        return None;
    }
    let along = (rel.x * d.x + rel.y * d.y) / len;
    if along <= EPSILON || along >= len - EPSILON {
        return None;
    }
    Some(along / len)
}

/// Cuts a contour wherever it revisits a vertex, so regions meeting at a single point become
/// separate contours. Only points on the window's boundary can repeat.
fn split_at_touches(contour: Vec<Coord>, window: &Window) -> Vec<Vec<Coord>> {
    let mut pieces = Vec::new();
    let mut current: Vec<Coord> = Vec::with_capacity(contour.len());
    for pt in contour {
        if window.on_boundary(pt) {
            if let Some(idx) = current.iter().position(|other| is_close(*other, pt)) {
                pieces.push(current.split_off(idx));
            }
        }
        current.push(pt);
    }
    pieces.push(current);
    pieces
}

/// Treats the contour as cyclic
fn merge_close_points(contour: Vec<Coord>) -> Vec<Coord> {
    let mut merged: Vec<Coord> = Vec::with_capacity(contour.len());
    for pt in contour {
        if merged.last().map_or(true, |last| !is_close(*last, pt)) {
            merged.push(pt);
        }
    }
    while merged.len() > 1 && is_close(merged[0], merged[merged.len() - 1]) {
        merged.pop();
    }
    merged
}

/// Drops near-duplicate vertices and vertices where the contour doubles back on itself.
fn remove_spikes(contour: Vec<Coord>) -> Vec<Coord> {
    let mut pts = merge_close_points(contour);
    loop {
        let before = pts.len();
        let mut kept: Vec<Coord> = Vec::with_capacity(pts.len());
        for pt in pts {
            if kept.last().is_some_and(|last| is_close(*last, pt)) {
                continue;
            }
            kept.push(pt);
            while kept.len() >= 3 {
                let n = kept.len();
                if !is_backtrack(kept[n - 3], kept[n - 2], kept[n - 1]) {
                    break;
                }
                kept.remove(n - 2);
            }
        }
        kept = merge_close_points(kept);
        let n = kept.len();
        if n >= 3 {
            if is_backtrack(kept[n - 2], kept[n - 1], kept[0]) {
                kept.pop();
            } else if is_backtrack(kept[n - 1], kept[0], kept[1]) {
                kept.remove(0);
            }
        }
        pts = kept;
        if pts.len() == before || pts.len() < 3 {
            return pts;
        }
    }
}

fn is_close(a: Coord, b: Coord) -> bool {
    (a.x - b.x).abs() <= EPSILON && (a.y - b.y).abs() <= EPSILON
}

/// `a -> b -> c` runs along one line and reverses direction at `b`
fn is_backtrack(a: Coord, b: Coord, c: Coord) -> bool {
    let u = b - a;
    let v = c - b;
    let longest = u.x.hypot(u.y).max(v.x.hypot(v.y));
    if longest <= EPSILON {
        return true;
    }
    (u.x * v.y - u.y * v.x).abs() / longest <= EPSILON && u.x * v.x + u.y * v.y < 0.0
}

fn rotate_to_lowest(contour: &mut [Coord]) {
    let lowest = contour
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
        .map(|(idx, _)| idx);
    if let Some(idx) = lowest {
        contour.rotate_left(idx);
    }
}

/// Touching contacts and thin slivers left over from floating point error
fn is_sliver(polygon: &Polygon) -> bool {
    let perimeter: f64 = polygon
        .exterior()
        .lines()
        .map(|line| line.dx().hypot(line.dy()))
        .sum();
    polygon.unsigned_area() <= EPSILON * perimeter
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
    Bottom,
    Top,
}

/// The part of one subject edge inside the window. `enters` and `leaves` are set when the edge
/// crosses the boundary partway along, rather than starting or ending inside.
struct Span {
    start: Coord,
    end: Coord,
    enters: bool,
    leaves: bool,
}

/// The clipping rectangle. Positions along its boundary are measured counter-clockwise from the
/// minimum corner.
struct Window {
    min: Coord,
    max: Coord,
}

impl Window {
    fn new(rect: &Rect) -> Self {
        Self {
            min: rect.min(),
            max: rect.max(),
        }
    }

    fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    fn center(&self) -> Coord {
        Coord {
            x: (self.min.x + self.max.x) / 2.0,
            y: (self.min.y + self.max.y) / 2.0,
        }
    }

    /// Counter-clockwise, with their perimeter positions
    fn corners(&self) -> [(Coord, f64); 4] {
        let (w, h) = (self.width(), self.height());
        [
            (self.min, 0.0),
            (Coord { x: self.max.x, y: self.min.y }, w),
            (self.max, w + h),
            (Coord { x: self.min.x, y: self.max.y }, 2.0 * w + h),
        ]
    }

    /// Inclusive, with tolerance
    fn contains(&self, pt: Coord) -> bool {
        pt.x >= self.min.x - EPSILON
            && pt.x <= self.max.x + EPSILON
            && pt.y >= self.min.y - EPSILON
            && pt.y <= self.max.y + EPSILON
    }

    fn clamp(&self, pt: Coord) -> Coord {
        Coord {
            x: pt.x.clamp(self.min.x, self.max.x),
            y: pt.y.clamp(self.min.y, self.max.y),
        }
    }

    fn on_boundary(&self, pt: Coord) -> bool {
        self.contains(pt)
            && ((pt.x - self.min.x).abs() <= EPSILON
                || (pt.x - self.max.x).abs() <= EPSILON
                || (pt.y - self.min.y).abs() <= EPSILON
                || (pt.y - self.max.y).abs() <= EPSILON)
    }

    /// True if every vertex and every edge midpoint of the chain lies on the window's boundary.
    /// Such a chain only touches the window from outside, or retraces its boundary.
    fn runs_along_boundary(&self, pts: &[Coord]) -> bool {
        pts.iter().all(|pt| self.on_boundary(*pt))
            && pts
                .windows(2)
                .all(|pair| self.on_boundary((pair[0] + pair[1]) / 2.0))
    }

    /// Moves points within EPSILON of the boundary exactly onto it. Everything else is unchanged.
    fn snap(&self, pt: Coord) -> Coord {
        if !self.contains(pt) {
            return pt;
        }
        let mut pt = self.clamp(pt);
        if pt.x - self.min.x <= EPSILON {
            pt.x = self.min.x;
        } else if self.max.x - pt.x <= EPSILON {
            pt.x = self.max.x;
        }
        if pt.y - self.min.y <= EPSILON {
            pt.y = self.min.y;
        } else if self.max.y - pt.y <= EPSILON {
            pt.y = self.max.y;
        }
        pt
    }

    /// Liang-Barsky against the exact window. Returns the part of the segment from `a` to `b`
    /// that's inside, with any crossing placed exactly on the side it crosses.
    fn clip_segment(&self, a: Coord, b: Coord) -> Option<Span> {
        let d = b - a;
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        let mut entered = None;
        let mut left = None;
        for (side, p, q) in [
            (Side::Left, -d.x, a.x - self.min.x),
            (Side::Right, d.x, self.max.x - a.x),
            (Side::Bottom, -d.y, a.y - self.min.y),
            (Side::Top, d.y, self.max.y - a.y),
        ] {
            if p == 0.0 {
                // Parallel to this side
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                if t > t1 {
                    return None;
                }
                if t > t0 {
                    t0 = t;
                    entered = Some(side);
                }
            } else {
                if t < t0 {
                    return None;
                }
                if t < t1 {
                    t1 = t;
                    left = Some(side);
                }
            }
        }
        Some(Span {
            start: entered.map_or(a, |side| self.crossing(a, b, side)),
            end: left.map_or(b, |side| self.crossing(a, b, side)),
            enters: entered.is_some(),
            leaves: left.is_some(),
        })
    }

    /// Where the segment crosses the line through one side. The segment must not be parallel to
    /// it.
    fn crossing(&self, a: Coord, b: Coord, side: Side) -> Coord {
        let d = b - a;
        match side {
            Side::Left | Side::Right => {
                let x = if side == Side::Left {
                    self.min.x
                } else {
                    self.max.x
                };
                let y = a.y + (x - a.x) * d.y / d.x;
                Coord {
                    x,
                    y: y.clamp(self.min.y, self.max.y),
                }
            }
            Side::Bottom | Side::Top => {
                let y = if side == Side::Bottom {
                    self.min.y
                } else {
                    self.max.y
                };
                let x = a.x + (y - a.y) * d.x / d.y;
                Coord {
                    x: x.clamp(self.min.x, self.max.x),
                    y,
                }
            }
        }
    }

    /// Where a point on the boundary sits, measured counter-clockwise from the minimum corner
    fn perimeter_position(&self, pt: Coord) -> f64 {
        let (w, h) = (self.width(), self.height());
        let candidates = [
            ((pt.y - self.min.y).abs(), pt.x - self.min.x),
            ((pt.x - self.max.x).abs(), w + pt.y - self.min.y),
            ((pt.y - self.max.y).abs(), w + h + self.max.x - pt.x),
            ((pt.x - self.min.x).abs(), 2.0 * w + h + self.max.y - pt.y),
        ];
        let (_, position) = candidates
            .into_iter()
            .fold((f64::INFINITY, 0.0), |best, candidate| {
                if candidate.0 < best.0 {
                    candidate
                } else {
                    best
                }
            });
        if position >= self.perimeter() - EPSILON {
            0.0
        } else {
            position.max(0.0)
        }
    }

    /// How far to travel counter-clockwise along the boundary between two positions
    fn walk_distance(&self, from: f64, to: f64) -> f64 {
        let perimeter = self.perimeter();
        let distance = (to - from).rem_euclid(perimeter);
        if perimeter - distance <= EPSILON {
            0.0
        } else {
            distance
        }
    }

    /// The corners passed while walking counter-clockwise from one position to another
    fn corners_between(&self, from: f64, to: f64) -> Vec<Coord> {
        let total = self.walk_distance(from, to);
        let mut passed: Vec<(f64, Coord)> = self
            .corners()
            .into_iter()
            .map(|(pt, position)| ((position - from).rem_euclid(self.perimeter()), pt))
            .filter(|(distance, _)| *distance > 0.0 && *distance < total)
            .collect();
        passed.sort_by(|a, b| a.0.total_cmp(&b.0));
        passed.into_iter().map(|(_, pt)| pt).collect()
    }
}
