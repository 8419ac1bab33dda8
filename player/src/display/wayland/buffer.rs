use std::os::fd::AsFd;
use std::sync::{Arc, Mutex};

use engine::Frame;
use wayland_client::protocol::{wl_buffer, wl_shm, wl_shm_pool};
use wayland_client::{Dispatch, QueueHandle};

/// Release state shared with the `wl_buffer` dispatcher
#[derive(Debug, Default)]
pub struct BufferState {
    pub busy: bool,
}

/// Shared memory buffer holding one ARGB8888 frame
pub struct ShmBuffer {
    pool: wl_shm_pool::WlShmPool,
    buffer: wl_buffer::WlBuffer,
    mmap: memmap2::MmapMut,
    width: u32,
    height: u32,
    state: Arc<Mutex<BufferState>>,
}

impl ShmBuffer {
    pub fn new<D>(
        shm: &wl_shm::WlShm,
        width: u32,
        height: u32,
        qh: &QueueHandle<D>,
    ) -> anyhow::Result<Self>
    where
        D: Dispatch<wl_shm_pool::WlShmPool, ()>
            + Dispatch<wl_buffer::WlBuffer, Arc<Mutex<BufferState>>>
            + 'static,
    {
        let stride = width * 4;
        let size = stride * height;

        let file = tempfile::tempfile()?;
        file.set_len(size as u64)?;

        let mmap = unsafe { memmap2::MmapMut::map_mut(&file)? };

        let pool = shm.create_pool(file.as_fd(), size as i32, qh, ());
        let state = Arc::new(Mutex::new(BufferState::default()));
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            wl_shm::Format::Argb8888,
            qh,
            state.clone(),
        );

        Ok(Self {
            pool,
            buffer,
            mmap,
            width,
            height,
            state,
        })
    }

    /// Copy an RGBA frame in, swizzling to ARGB8888 (BGRA byte order)
    pub fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            anyhow::bail!(
                "Frame size mismatch: buffer is {}x{}, frame is {}x{}",
                self.width,
                self.height,
                frame.width(),
                frame.height()
            );
        }

        for (dst, src) in self.mmap.chunks_exact_mut(4).zip(frame.as_raw().chunks_exact(4)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = 0xff;
        }
        Ok(())
    }

    pub fn buffer(&self) -> &wl_buffer::WlBuffer {
        &self.buffer
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Compositor holds the buffer until it sends a release
    pub fn mark_busy(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.busy = true;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().map(|s| s.busy).unwrap_or(true)
    }
}

impl Drop for ShmBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}
