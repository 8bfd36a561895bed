//! Application constants

/// Number of emotion labels in every result block
pub const EMOTION_COUNT: usize = 8;

/// Size in bytes of one encoded result block (8 big-endian f32)
pub const BLOCK_SIZE: usize = EMOTION_COUNT * 4;

/// Maximum upload size (512 MB)
pub const MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

/// Frames per second sampled from uploaded videos
pub const DEFAULT_FRAME_RATE: u32 = 4;

pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_UPLOAD_FOLDER: &str = "./uploads";

pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

pub const DEFAULT_FFMPEG_THREADS: usize = 1;

/// Hugging Face repo holding the ViT facial expression model
pub const DEFAULT_MODEL_REPO: &str = "HardlyHumans/Facial-expression-detection";

/// Prefix for per-request frame directories and the frames work root
pub const FRAMES_DIR_PREFIX: &str = "bhavna_frames";

/// Content type of successful upload responses
pub const RESULT_CONTENT_TYPE: &str = "application/octet-stream";
