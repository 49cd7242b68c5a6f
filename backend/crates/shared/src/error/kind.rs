//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every crate in the workspace.

/// エラー種別の列挙体
///
/// 認証サポート層のエラー分類を定義します。
/// 各バリアントは呼び出し側での扱い方（縮退・拒否・中断）に対応します。
///
/// ## Notes
/// * `non_exhaustive` - 将来的に列挙子が追加される可能性があることを示す
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::PolicyViolation;
/// assert_eq!(kind.as_str(), "Policy Violation");
/// assert!(kind.is_user_visible());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// ロック・読み込み・保存の失敗（ログに記録し、安全側に縮退）
    TransientStore,
    /// パスワードポリシー違反（理由付きで呼び出し元に返す）
    PolicyViolation,
    /// 設定エラー（必須の依存機能が無い、ポリシー文字列が不正など）
    Configuration,
    /// 保存値の形式エラー（検証は不一致として扱う）
    Format,
    /// レート制限による拒否
    Refused,
    /// 内部エラー
    Internal,
}

impl ErrorKind {
    /// ユーザー向けの文字列表現を取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::TransientStore.as_str(), "Transient Store");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientStore => "Transient Store",
            ErrorKind::PolicyViolation => "Policy Violation",
            ErrorKind::Configuration => "Configuration",
            ErrorKind::Format => "Format",
            ErrorKind::Refused => "Refused",
            ErrorKind::Internal => "Internal",
        }
    }

    /// 詳細をクライアントに見せてよいかどうか
    ///
    /// ポリシー違反は具体的なメッセージを返しますが、
    /// 内部事情（ストア障害など）は汎用的な拒否のみを返します。
    #[inline]
    pub const fn is_user_visible(&self) -> bool {
        matches!(self, ErrorKind::PolicyViolation | ErrorKind::Refused)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
