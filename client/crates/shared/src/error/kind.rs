//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by the request client, the geo cache
//! and the exclusive flow.

use serde::Serialize;

/// エラー種別の列挙体
///
/// クライアント層で発生するエラーの分類を定義します。
/// シリアライズ時は `NETWORK_ERROR` のような SCREAMING_SNAKE_CASE になります。
///
/// ## Notes
/// * `non_exhaustive` - 将来的に列挙子が追加される可能性があることを示す
/// * HTTP ステータスはサーバー応答に依存するため、種別とは別に保持する
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::RefreshFailed;
/// assert_eq!(kind.code(), "REFRESH_FAILED");
/// assert!(kind.is_session_expired());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// status 0: 通信レベルの失敗（DNS、オフライン、タイムアウト）
    NetworkError,
    /// 401: リフレッシュトークンが存在しない
    NoRefreshToken,
    /// 401: リフレッシュ要求が拒否された
    RefreshFailed,
    /// 401: リフレッシュ対象外の認証エラー（再送後の 401 など）
    Unauthorized,
    /// 近隣検索のローカルなレート制限（GeoCache のみ、サーバーの 429 ではない）
    RateLimited,
    /// 4xx（401 以外）またはローカルの不正操作
    Validation,
    /// 5xx、または解釈できない応答
    ServerError,
    /// 位置情報が取得できない（許可拒否・タイムアウト）
    ProximityUnknown,
    /// クライアント内部エラー（ストレージ障害など）
    Internal,
}

impl ErrorKind {
    /// ワイヤー上のエラーコードを取得
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::NetworkError.code(), "NETWORK_ERROR");
    /// ```
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::NoRefreshToken => "NO_REFRESH_TOKEN",
            ErrorKind::RefreshFailed => "REFRESH_FAILED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::ProximityUnknown => "PROXIMITY_UNKNOWN",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// ユーザー向けの文字列表現を取得
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "Network Error",
            ErrorKind::NoRefreshToken => "No Refresh Token",
            ErrorKind::RefreshFailed => "Refresh Failed",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::RateLimited => "Rate Limited",
            ErrorKind::Validation => "Validation",
            ErrorKind::ServerError => "Server Error",
            ErrorKind::ProximityUnknown => "Proximity Unknown",
            ErrorKind::Internal => "Internal",
        }
    }

    /// 種別に対応する既定の HTTP ステータス
    ///
    /// サーバーが返したステータスがある場合はそちらが優先されます。
    #[inline]
    pub const fn default_status(&self) -> u16 {
        match self {
            ErrorKind::NetworkError => 0,
            ErrorKind::NoRefreshToken | ErrorKind::RefreshFailed | ErrorKind::Unauthorized => 401,
            ErrorKind::RateLimited => 429,
            ErrorKind::Validation => 400,
            ErrorKind::ServerError | ErrorKind::Internal => 500,
            ErrorKind::ProximityUnknown => 0,
        }
    }

    /// HTTP ステータスから種別を推定
    ///
    /// 401 は呼び出し側の文脈（リフレッシュの有無）で決まるため `Unauthorized` を返します。
    pub const fn from_status(status: u16) -> Self {
        match status {
            0 => ErrorKind::NetworkError,
            401 => ErrorKind::Unauthorized,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::ServerError,
        }
    }

    /// セッション切れとして扱う種別かどうか
    ///
    /// `true` の場合、進行中のフローを破棄して再認証へ誘導します。
    #[inline]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, ErrorKind::NoRefreshToken | ErrorKind::RefreshFailed)
    }

    /// ユーザーが同じ操作を再試行できる一時的なエラーかどうか
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError
                | ErrorKind::RateLimited
                | ErrorKind::ServerError
                | ErrorKind::ProximityUnknown
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
