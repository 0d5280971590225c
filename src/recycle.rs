use crossbeam::queue::SegQueue;


/// Сброс объекта перед возвратом в free list.
pub trait Recycle: Default {
    fn reset(&mut self);
}

/// Free list для горячих объектов пула (записи задач и воркеров).
/// Чисто оптимизация: `get` без переиспользования ведет себя так же, как `Box::new`.
pub struct Recycler<T: Recycle> {
    free: SegQueue<Box<T>>,
}

impl<T: Recycle> Recycler<T> {
    pub fn new() -> Self {
        Self { free: SegQueue::new() }
    }

    #[inline]
    pub fn get(&self) -> Box<T> {
        self.free.pop().unwrap_or_default()
    }

    #[inline]
    pub fn put(&self, mut item: Box<T>) {
        item.reset();
        self.free.push(item);
    }

    #[inline]
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl<T: Recycle> Default for Recycler<T> {
    fn default() -> Self {
        Self::new()
    }
}
