/// A bounded 2D grid indexed by `(x, z)`. Edges do not wrap.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T> Tilemap<T> {
    /// Build a grid by evaluating `f` for every cell, x-major.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for z in 0..height {
            for x in 0..width {
                data.push(f(x, z));
            }
        }
        Self { width, height, data }
    }

    fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.width && z < self.height);
        z * self.width + x
    }

    pub fn get(&self, x: usize, z: usize) -> &T {
        &self.data[self.index(x, z)]
    }

    pub fn get_mut(&mut self, x: usize, z: usize) -> &mut T {
        let idx = self.index(x, z);
        &mut self.data[idx]
    }

    /// Cells of the `(2r+1)^2` block around `(x, z)`, including the center,
    /// skipping anything past the edges. Ordered x-major (x outer, z inner).
    pub fn neighborhood(&self, x: usize, z: usize, radius: usize) -> Vec<(usize, usize)> {
        let r = radius as i64;
        let mut result = Vec::with_capacity((2 * radius + 1).pow(2));

        for dx in -r..=r {
            for dz in -r..=r {
                let nx = x as i64 + dx;
                let nz = z as i64 + dz;
                if nx < 0 || nz < 0 || nx >= self.width as i64 || nz >= self.height as i64 {
                    continue;
                }
                result.push((nx as usize, nz as usize));
            }
        }

        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| (idx % width, idx / width, val))
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(idx, val)| (idx % width, idx / width, val))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_clamps_at_corner() {
        let map = Tilemap::from_fn(4, 4, |_, _| 0u8);
        let cells = map.neighborhood(0, 0, 1);
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_neighborhood_interior_is_full() {
        let map = Tilemap::from_fn(5, 5, |_, _| 0u8);
        assert_eq!(map.neighborhood(2, 2, 1).len(), 9);
    }

    #[test]
    fn test_from_fn_layout() {
        let map = Tilemap::from_fn(3, 2, |x, z| x * 10 + z);
        assert_eq!(*map.get(2, 1), 21);
        let collected: Vec<_> = map.iter().map(|(x, z, v)| (x, z, *v)).collect();
        assert_eq!(collected[4], (1, 1, 11));
    }
}
