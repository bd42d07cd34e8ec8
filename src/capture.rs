use crate::skeleton::Skeleton;

/// 骨格データの取得元
///
/// `update()` を1ティックに1回呼んでから `skeletons()` を読む。
/// 接続していない間は空のスライスを返す。
pub trait CaptureSource {
    fn update(&mut self);

    fn skeletons(&self) -> &[Skeleton];
}
