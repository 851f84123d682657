use crate::math::{Dimensions, Point};

/// A dense, row-major grid of `T`, addressed by [`Point`].
#[derive(Clone, Debug)]
pub struct Grid<T> {
    data: Vec<T>,
    dims: Dimensions,
}

impl<T> Grid<T> {
    pub const fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        debug_assert_eq!(self.data.len() % self.dims.width.max(1), 0);
        self.data.chunks(self.dims.width.max(1))
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (Point, &T)> {
        self.dims.iter_within().zip(self.data.iter())
    }

    pub fn from_fn(dims: Dimensions, map_fn: impl FnMut(Point) -> T) -> Self {
        Grid { data: dims.iter_within().map(map_fn).collect(), dims }
    }

    pub fn try_from_vec(dims: Dimensions, data: Vec<T>) -> Option<Self> {
        (data.len() == dims.area()).then_some(Grid { data, dims })
    }

    pub fn get(&self, point: Point) -> Option<&T> {
        self.index_of(point).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, point: Point) -> Option<&mut T> {
        let i = self.index_of(point)?;
        Some(&mut self.data[i])
    }

    fn index_of(&self, point: Point) -> Option<usize> {
        self.dims.contains(point).then(|| point.x as usize + point.y as usize * self.dims.width)
    }
}

impl<T: Default + Clone> Grid<T> {
    pub fn new(dims: Dimensions) -> Self {
        Grid { data: vec![T::default(); dims.area()], dims }
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_fill(dims: Dimensions, value: T) -> Self {
        Grid { data: vec![value; dims.area()], dims }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_roundtrips_through_from_fn() {
        let dims = Dimensions::new(4, 3);
        let grid = Grid::from_fn(dims, |p| p.x + p.y * 10);

        for p in dims.iter_within() {
            assert_eq!(*grid.get(p).unwrap(), p.x + p.y * 10);
        }
        assert!(grid.get(Point::new(-1, 0)).is_none());
        assert!(grid.get(Point::new(4, 0)).is_none());
    }

    #[test]
    fn get_mut_writes_back() {
        let mut grid: Grid<i32> = Grid::new(Dimensions::new(2, 2));
        *grid.get_mut(Point::new(1, 1)).unwrap() = 42;
        assert_eq!(*grid.get(Point::new(1, 1)).unwrap(), 42);
        assert_eq!(*grid.get(Point::new(0, 0)).unwrap(), 0);
    }

    #[test]
    fn try_from_vec_rejects_mismatched_length() {
        let dims = Dimensions::new(3, 3);
        assert!(Grid::try_from_vec(dims, vec![true; 8]).is_none());
        assert!(Grid::try_from_vec(dims, vec![true; 9]).is_some());
    }
}
