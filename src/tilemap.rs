/// A 2D grid over one region. Regions are bounded, so unlike a world map the
/// grid does not wrap: lookups outside it clamp to the nearest edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` if the length does
    /// not match the dimensions.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == width * height).then_some(Self { width, height, data })
    }

    fn index(&self, x: usize, y: usize) -> usize {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % self.width;
            let y = idx / self.width;
            (x, y, val)
        })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Tilemap<f32> {
    /// Smallest and largest value, `(0, 0)` for an empty map.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;
        for &v in &self.data {
            if v < min_v { min_v = v; }
            if v > max_v { max_v = v; }
        }
        if self.data.is_empty() { (0.0, 0.0) } else { (min_v, max_v) }
    }

    /// Values rescaled to 0-1 against the map's own range.
    pub fn normalized(&self) -> Tilemap<f32> {
        let (min_v, max_v) = self.min_max();
        let range = (max_v - min_v).max(f32::EPSILON);
        Tilemap {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| (v - min_v) / range).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_clamps_instead_of_wrapping() {
        let mut map = Tilemap::new_with(3, 2, 0u8);
        map.set(2, 1, 9);
        assert_eq!(*map.get(7, 5), 9);
        assert_eq!(*map.get(0, 0), 0);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Tilemap::from_vec(2, 2, vec![1, 2, 3]).is_none());
        let map = Tilemap::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(*map.get(1, 1), 4);
    }

    #[test]
    fn test_normalized_range() {
        let map = Tilemap::from_vec(2, 1, vec![-4.0f32, 6.0]).unwrap();
        assert_eq!(map.min_max(), (-4.0, 6.0));
        let n = map.normalized();
        assert_eq!(n.as_slice(), &[0.0, 1.0]);
    }
}
