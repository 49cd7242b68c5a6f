//! Application Error - Unified error type for the workspace
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use super::kind::ErrorKind;

/// 拒否時にクライアントへ返す汎用メッセージ
const GENERIC_REFUSAL: &str = "Login refused, please try again later";

/// アプリケーション統一エラー型
///
/// ワークスペース全体で使用する標準エラー型です。
/// ビルダーパターンを使用してエラーを構築できます。
///
/// ## Fields
/// * `kind` - エラーの分類（縮退・拒否・中断の判断に使用）
/// * `message` - ログおよび利用者向けのエラーメッセージ
/// * `action` - 利用者が取るべきアクション（オプション）
/// * `source` - 元のエラー（オプション、デバッグ用）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// // シンプルなエラー
/// let err = AppError::new(ErrorKind::Format, "Malformed password hash");
///
/// // 詳細なエラー
/// let err = AppError::new(
///     ErrorKind::PolicyViolation,
///     "password too short, at least 8 chars required",
/// )
/// .with_action("Please choose a longer password");
/// ```
pub struct AppError {
    /// エラー種別
    kind: ErrorKind,
    /// メッセージ
    message: Cow<'static, str>,
    /// 利用者が取るべきアクション
    action: Option<Cow<'static, str>>,
    /// 元のエラー（デバッグ用）
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
///
/// `Result<T, AppError>` の省略形です。
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::{AppError, AppResult}, kind::ErrorKind};
///
/// fn parse_cost(raw: &str) -> AppResult<u32> {
///     raw.parse::<u32>()
///         .map_err(|_| AppError::new(ErrorKind::Configuration, "Invalid cost factor"))
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// 新しいエラーを作成
    ///
    /// ## Arguments
    /// * `kind` - エラー種別
    /// * `message` - メッセージ
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
            source: None,
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// 利用者向けアクションを設定
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::{app_error::AppError, kind::ErrorKind};
    /// let err = AppError::new(ErrorKind::PolicyViolation, "password too simple")
    ///     .with_action("Mix upper and lower case letters and digits");
    /// ```
    #[inline]
    pub fn with_action(mut self, action: impl Into<Cow<'static, str>>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// 元のエラーを設定（デバッグ用）
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::{app_error::{AppError, AppResult}, kind::ErrorKind};
    ///
    /// fn read_counters() -> AppResult<String> {
    ///     std::fs::read_to_string("sftp.rate_limits.json").map_err(|e| {
    ///         AppError::new(ErrorKind::TransientStore, "Failed to read counters").with_source(e)
    ///     })
    /// }
    /// ```
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// エラー種別を取得
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// メッセージを取得
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// アクションを取得
    #[inline]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// クライアントに見せるメッセージを取得
    ///
    /// ポリシー違反・拒否以外では内部の詳細を隠し、汎用メッセージを返します。
    pub fn user_message(&self) -> &str {
        if self.kind.is_user_visible() {
            &self.message
        } else {
            GENERIC_REFUSAL
        }
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        builder.field("message", &self.message);
        if let Some(action) = &self.action {
            builder.field("action", action);
        }
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(action) = &self.action {
            write!(f, " (Action: {})", action)?;
        }
        Ok(())
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

// ============================================================================
// Result extension traits
// ============================================================================

/// `Result<T, E>` を `AppResult<T>` に変換するための拡張トレイト
pub trait ResultExt<T, E> {
    /// エラーを `AppError` に変換し、指定した種別とメッセージでラップ
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_app_err(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> AppResult<T>
    where
        E: Error + Send + Sync + 'static,
    {
        self.map_err(|e| AppError::new(kind, message).with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error() {
        let err = AppError::new(ErrorKind::Format, "Malformed hash");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.message(), "Malformed hash");
        assert!(err.action().is_none());
    }

    #[test]
    fn test_with_action() {
        let err = AppError::new(ErrorKind::PolicyViolation, "too short")
            .with_action("Use more characters");
        assert_eq!(err.action(), Some("Use more characters"));
    }

    #[test]
    fn test_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "locked");
        let err = AppError::new(ErrorKind::TransientStore, "Failed to lock counters")
            .with_source(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_display() {
        let err = AppError::new(ErrorKind::Format, "Malformed hash");
        assert_eq!(err.to_string(), "[Format] Malformed hash");

        let err_with_action = AppError::new(ErrorKind::PolicyViolation, "too short")
            .with_action("Use more characters");
        assert!(err_with_action.to_string().contains("Action:"));
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::new(ErrorKind::TransientStore, "flock on /var/run/sftp.lock failed");
        assert_eq!(err.user_message(), GENERIC_REFUSAL);

        let err = AppError::new(ErrorKind::PolicyViolation, "password too short");
        assert_eq!(err.user_message(), "password too short");
    }

    #[test]
    fn test_result_ext() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not found",
        ));
        let app_result = result.map_app_err(ErrorKind::TransientStore, "Counter file missing");
        assert!(app_result.is_err());
        assert_eq!(app_result.unwrap_err().kind(), ErrorKind::TransientStore);
    }
}
