use crate::common::word::Word;
use crate::error::ExceptionalHalt;

pub const STACK_LIMIT: usize = 1024;

/// Operand stack of one frame. Failed operations leave it untouched.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bottom first.
    pub fn data(&self) -> &[Word] {
        &self.data
    }

    pub fn push(&mut self, word: Word) -> Result<(), ExceptionalHalt> {
        if self.data.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.data.push(word);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word, ExceptionalHalt> {
        self.data.pop().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Pops `N` words, top of the stack first.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N], ExceptionalHalt> {
        if self.data.len() < N {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        let mut ret = [Word::zero(); N];
        for slot in ret.iter_mut() {
            *slot = self.data.pop().ok_or(ExceptionalHalt::StackUnderflow)?;
        }
        Ok(ret)
    }

    /// `n`-th word from the top, 0 being the top.
    pub fn peek(&self, n: usize) -> Result<Word, ExceptionalHalt> {
        let len = self.data.len();
        if n >= len {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        Ok(self.data[len - 1 - n])
    }

    /// DUPn: copies the `n`-th word (1-based) onto the top.
    pub fn dup(&mut self, n: usize) -> Result<(), ExceptionalHalt> {
        let word = self.peek(n - 1)?;
        self.push(word)
    }

    /// SWAPn: exchanges the top with the word `n` below it.
    pub fn swap(&mut self, n: usize) -> Result<(), ExceptionalHalt> {
        let len = self.data.len();
        if n >= len {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifo() {
        let mut stack = Stack::new();
        for i in 0..10u32 {
            stack.push(Word::from(i)).unwrap();
        }
        for i in (0..10u32).rev() {
            assert_eq!(stack.pop().unwrap(), Word::from(i));
        }
        assert_eq!(stack.pop(), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_overflow_does_not_mutate() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(Word::from(i)).unwrap();
        }
        assert_eq!(stack.push(Word::one()), Err(ExceptionalHalt::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
        assert_eq!(stack.peek(0).unwrap(), Word::from(STACK_LIMIT - 1));
        assert_eq!(stack.dup(1), Err(ExceptionalHalt::StackOverflow));
    }

    #[test]
    fn test_pop_n_is_atomic() {
        let mut stack = Stack::new();
        stack.push(Word::one()).unwrap();
        stack.push(Word::from(2u8)).unwrap();
        assert_eq!(stack.pop_n::<3>(), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.len(), 2);
        let [a, b] = stack.pop_n().unwrap();
        assert_eq!((a, b), (Word::from(2u8), Word::one()));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_dup_swap() {
        let mut stack = Stack::new();
        stack.push(Word::one()).unwrap();
        stack.push(Word::from(2u8)).unwrap();
        stack.push(Word::from(3u8)).unwrap();
        stack.dup(3).unwrap();
        assert_eq!(stack.peek(0).unwrap(), Word::one());
        stack.swap(3).unwrap();
        assert_eq!(stack.data(), &[Word::one(), Word::from(2u8), Word::from(3u8), Word::one()]);
        assert_eq!(stack.swap(4), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.dup(5), Err(ExceptionalHalt::StackUnderflow));
    }
}
