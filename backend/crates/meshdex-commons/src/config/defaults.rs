// Default value functions

pub fn default_forward_key_suffix() -> String {
    "index".to_string()
}

pub fn default_data_path() -> String {
    "./data".to_string() // Default dev path
}

pub fn default_cas_max_retries() -> u32 {
    16
}

pub fn default_block_cache_size() -> usize {
    8 * 1024 * 1024 // 8MB
}

pub fn default_max_open_files() -> i32 {
    512
}
