use crate::domain::model::{Item, NewItem};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 所有 collector 共用的持久化儲存
///
/// `append` 必須可被多個 collector 同時呼叫；id 在寫入時依序分配且不重複使用。
pub trait ItemStore: Send + Sync {
    /// 建立資料表 (已存在則不動)
    fn ensure_schema(&self) -> Result<()>;

    fn append(&self, item: NewItem) -> Result<Item>;

    /// 依 id 順序回傳目前所有記錄，每次呼叫重新讀取
    fn all(&self) -> Result<Vec<Item>>;

    fn count(&self) -> Result<usize>;
}

/// 單一資料來源。成功回傳前應已把找到的 item 寫入 store。
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    /// 回傳寫入的 item 數量
    async fn run(&self, store: &dyn ItemStore) -> Result<usize>;
}
