//! Helper traits to extend [`Buf`] and [`BufMut`] with codec methods.
use {
    super::Codec,
    anyhow::{ensure, Result},
    bytes::{Buf, BufMut},
};

pub trait BufCodec<C, T>
where
    C: Codec<T>,
{
    fn get_codec_parent(&mut self, codec: &C, parent: C::Parent) -> Result<T>;

    /// Decodes a value that must span the whole remaining buffer.
    fn get_codec_exact(&mut self, codec: &C, parent: C::Parent) -> Result<T>;
}

pub trait BufMutCodec<C, T>
where
    C: Codec<T>,
{
    fn put_codec(&mut self, codec: &C, value: T);
}

impl<B, C, T> BufCodec<C, T> for B
where
    B: Buf,
    C: Codec<T>,
{
    fn get_codec_parent(&mut self, codec: &C, parent: C::Parent) -> Result<T> {
        codec.decode(self, parent)
    }

    fn get_codec_exact(&mut self, codec: &C, parent: C::Parent) -> Result<T> {
        let value = codec.decode(self, parent)?;
        ensure!(
            !self.has_remaining(),
            "{} trailing bytes after value",
            self.remaining()
        );
        Ok(value)
    }
}

impl<B, C, T> BufMutCodec<C, T> for B
where
    B: BufMut,
    C: Codec<T>,
{
    fn put_codec(&mut self, codec: &C, value: T) {
        codec.encode(self, value);
    }
}
