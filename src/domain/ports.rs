use crate::utils::error::Result;

/// 唯讀的資料來源。路徑一律是相對於資料根目錄、以 `/` 分隔
pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    fn exists(&self, path: &str) -> bool;

    /// 依字典序列出所有檔案，逐一產生
    fn list_files(&self) -> Box<dyn Iterator<Item = Result<String>> + '_>;
}

pub trait ConfigProvider {
    fn data_dir(&self) -> Option<&str>;
    fn resamples(&self) -> usize;
    fn seed(&self) -> Option<u64>;
    fn output_format(&self) -> &str;

    fn max_iterations(&self) -> Option<usize> {
        None
    }
}
