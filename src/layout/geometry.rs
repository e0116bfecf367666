use serde::{Deserialize, Serialize};

/// Padding used by every "does this photo touch that photo" check
pub const COLLISION_MARGIN: f64 = 10.0;

/// Share of either rectangle's area the alternate packer tolerates as overlap
pub const MAX_OVERLAP_RATIO: f64 = 0.25;

/// Axis-aligned rectangle in board pixels, origin at the top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow outward by `margin` on every side
    pub fn expand(&self, margin: f64) -> Rect {
        Rect {
            left: self.left - margin,
            top: self.top - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }
}

/// True when `a` and `b`, each grown by `margin`, share any point (touching counts)
pub fn overlaps(a: &Rect, b: &Rect, margin: f64) -> bool {
    let a = a.expand(margin);
    let b = b.expand(margin);
    !(a.right() < b.left || a.left > b.right() || a.bottom() < b.top || a.top > b.bottom())
}

/// True when `candidate` overlaps any of `others`
pub fn collides_with_any<'a, I>(candidate: &Rect, others: I, margin: f64) -> bool
where
    I: IntoIterator<Item = &'a Rect>,
{
    others.into_iter().any(|other| overlaps(candidate, other, margin))
}

/// Exact intersection area, 0 when disjoint or only touching
pub fn overlap_area(a: &Rect, b: &Rect) -> f64 {
    let left = a.left.max(b.left);
    let top = a.top.max(b.top);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());
    if right <= left || bottom <= top {
        return 0.0;
    }
    (right - left) * (bottom - top)
}

/// Area rule of the alternate packer: no intersection may exceed
/// [`MAX_OVERLAP_RATIO`] of the candidate's area or of the other rectangle's.
pub fn within_overlap_limit(candidate: &Rect, existing: &[Rect]) -> bool {
    let candidate_limit = candidate.area() * MAX_OVERLAP_RATIO;
    existing.iter().all(|other| {
        let shared = overlap_area(candidate, other);
        shared <= candidate_limit && shared <= other.area() * MAX_OVERLAP_RATIO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_rects_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(150.0, 0.0, 100.0, 100.0);
        assert!(!overlaps(&a, &b, 0.0));
        assert!(!overlaps(&a, &b, 20.0));
        // gap of 50 closes once both sides grow by 25
        assert!(overlaps(&a, &b, 25.0));
    }

    #[test]
    fn test_touching_counts_as_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 100.0, 10.0, 10.0);
        assert!(overlaps(&a, &b, 0.0));
        assert_eq!(overlap_area(&a, &b), 0.0);
    }

    #[test]
    fn test_overlap_area() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 60.0, 100.0, 100.0);
        assert_eq!(overlap_area(&a, &b), 50.0 * 40.0);
        assert_eq!(overlap_area(&b, &a), 50.0 * 40.0);
        assert_eq!(overlap_area(&a, &Rect::new(300.0, 0.0, 5.0, 5.0)), 0.0);
    }

    #[test]
    fn test_overlap_limit_checks_both_areas() {
        let big = Rect::new(0.0, 0.0, 200.0, 200.0);
        // small rect entirely inside the big one: 100% of its own area
        let small = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(!within_overlap_limit(&small, &[big]));

        let neighbour = Rect::new(180.0, 0.0, 200.0, 200.0);
        assert!(within_overlap_limit(&neighbour, &[big]));

        let heavy = Rect::new(100.0, 0.0, 200.0, 200.0);
        assert!(!within_overlap_limit(&heavy, &[big]));
    }

    #[test]
    fn test_collides_with_any() {
        let placed = [Rect::new(0.0, 0.0, 50.0, 50.0), Rect::new(200.0, 0.0, 50.0, 50.0)];
        assert!(collides_with_any(&Rect::new(240.0, 40.0, 10.0, 10.0), placed.iter(), 0.0));
        assert!(!collides_with_any(&Rect::new(100.0, 0.0, 50.0, 50.0), placed.iter(), 10.0));
    }
}
