//! Dense 3D grid over flat storage.

/// A dense `size_x * size_y * size_z` grid stored X-fastest, then Y, then Z.
///
/// [`at`](Self::at) and [`at_mut`](Self::at_mut) check bounds in debug builds
/// only; [`get`](Self::get) accepts signed coordinates and returns `None`
/// outside the grid.
#[derive(Clone, Debug)]
pub struct Grid3D<T> {
    size: [usize; 3],
    data: Vec<T>,
}

impl<T> Grid3D<T> {
    /// Builds a grid by calling `f(x, y, z)` for every cell.
    pub fn from_fn(size: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(size[0] * size[1] * size[2]);
        for z in 0..size[2] {
            for y in 0..size[1] {
                for x in 0..size[0] {
                    data.push(f(x, y, z));
                }
            }
        }
        Self { size, data }
    }

    /// Grid size `[x, y, z]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(x, y, z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(
            x < self.size[0] && y < self.size[1] && z < self.size[2],
            "({x}, {y}, {z}) outside grid {:?}",
            self.size
        );
        (z * self.size[1] + y) * self.size[0] + x
    }

    /// Returns `true` if the signed coordinate lies inside the grid.
    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.size[0]
            && (y as usize) < self.size[1]
            && (z as usize) < self.size[2]
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize, z: usize) -> &T {
        &self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn at_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        let idx = self.index(x, y, z);
        &mut self.data[idx]
    }

    /// Signed lookup; `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<&T> {
        if self.contains(x, y, z) {
            Some(self.at(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Clone> Grid3D<T> {
    /// Creates a grid with every cell set to `value`.
    pub fn new(size: [usize; 3], value: T) -> Self {
        Self {
            size,
            data: vec![value; size[0] * size[1] * size[2]],
        }
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}
