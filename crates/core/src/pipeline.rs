//! 싱크 trait -- 출력 레코드의 다운스트림 확장 포인트
//!
//! [`PointSink`]는 RPITIT(`impl Future`)를 사용하므로 `dyn PointSink`가 불가합니다.
//! 실행 시점에 싱크 종류를 고르는 경우 [`DynPointSink`]를 `Box`로 감싸 사용합니다.
//!
//! # 생명주기
//! ```text
//! prepare() ──▶ write_points() × N ──▶ close()
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::error::DiagfluxError;
use crate::types::OutputRecord;

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 출력 레코드를 시계열 저장소로 보내는 trait
///
/// 새로운 저장소를 지원하려면 이 trait을 구현합니다.
pub trait PointSink: Send {
    /// 싱크 이름 (로그 표시용)
    fn name(&self) -> &str;

    /// 쓰기 전 준비 (연결, 데이터베이스 생성/선택 등)
    fn prepare(&mut self) -> impl Future<Output = Result<(), DiagfluxError>> + Send;

    /// 레코드 배치를 한 번에 전송합니다. 빈 배치로 호출되지 않습니다.
    fn write_points(
        &mut self,
        records: &[OutputRecord],
    ) -> impl Future<Output = Result<(), DiagfluxError>> + Send;

    /// 연결을 정리합니다. 실패한 실행 이후에도 호출됩니다.
    fn close(&mut self) -> impl Future<Output = Result<(), DiagfluxError>> + Send;
}

/// dyn-compatible 싱크 trait
///
/// `PointSink`를 구현한 타입은 자동으로 `DynPointSink`도 구현됩니다.
pub trait DynPointSink: Send {
    /// 싱크 이름
    fn name(&self) -> &str;

    /// 쓰기 전 준비
    fn prepare(&mut self) -> BoxFuture<'_, Result<(), DiagfluxError>>;

    /// 레코드 배치 전송
    fn write_points<'a>(
        &'a mut self,
        records: &'a [OutputRecord],
    ) -> BoxFuture<'a, Result<(), DiagfluxError>>;

    /// 연결 정리
    fn close(&mut self) -> BoxFuture<'_, Result<(), DiagfluxError>>;
}

impl<T: PointSink> DynPointSink for T {
    fn name(&self) -> &str {
        PointSink::name(self)
    }

    fn prepare(&mut self) -> BoxFuture<'_, Result<(), DiagfluxError>> {
        Box::pin(PointSink::prepare(self))
    }

    fn write_points<'a>(
        &'a mut self,
        records: &'a [OutputRecord],
    ) -> BoxFuture<'a, Result<(), DiagfluxError>> {
        Box::pin(PointSink::write_points(self, records))
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), DiagfluxError>> {
        Box::pin(PointSink::close(self))
    }
}

/// 실행 시점에 선택된 싱크를 다시 `PointSink`로 노출합니다.
impl PointSink for Box<dyn DynPointSink> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn prepare(&mut self) -> impl Future<Output = Result<(), DiagfluxError>> + Send {
        self.as_mut().prepare()
    }

    fn write_points(
        &mut self,
        records: &[OutputRecord],
    ) -> impl Future<Output = Result<(), DiagfluxError>> + Send {
        async move { self.as_mut().write_points(records).await }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), DiagfluxError>> + Send {
        self.as_mut().close()
    }
}
