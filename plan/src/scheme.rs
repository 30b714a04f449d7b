use core::fmt;

use gfp_catalog::KernelKind;

use crate::{ArrayType, OperatingBuffer};

/// Every kind of node an execution tree can contain.
///
/// The first group are composite nodes that expand into children; the `Kernel*` variants are
/// leaves that map to exactly one GPU kernel launch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComputeScheme {
    /// Arbitrary length 1D transform computed as a convolution.
    Bluestein,
    /// Two-kernel 1D transform: column pass then row pass with transposed output.
    L1dCc,
    /// Real transform computed with a full-length complex transform.
    RealViaComplex,

    KernelStockham,
    KernelStockhamBlockCc,
    KernelStockhamBlockRc,
    KernelChirp,
    KernelPadMul,
    KernelFftMul,
    KernelResMul,
    KernelBluesteinSingle,
    KernelCopyRToCmplx,
    KernelCopyCmplxToHerm,
    KernelCopyHermToCmplx,
    KernelCopyCmplxToR,
}

impl ComputeScheme {
    pub const fn is_leaf(self) -> bool {
        !matches!(self, Self::Bluestein | Self::L1dCc | Self::RealViaComplex)
    }

    /// The catalog kernel an FFT leaf is generated from.
    pub const fn kernel_kind(self) -> Option<KernelKind> {
        match self {
            Self::KernelStockham => Some(KernelKind::Stockham),
            Self::KernelStockhamBlockCc => Some(KernelKind::StockhamBlockCc),
            Self::KernelStockhamBlockRc => Some(KernelKind::StockhamBlockRc),
            _ => None,
        }
    }

    /// Buffer the kernel must write to, regardless of what the search would prefer.
    pub const fn required_out_buffer(self) -> Option<OperatingBuffer> {
        match self {
            Self::KernelPadMul | Self::KernelFftMul => Some(OperatingBuffer::TempBluestein),
            Self::KernelCopyRToCmplx | Self::KernelCopyHermToCmplx => {
                Some(OperatingBuffer::TempCmplxForReal)
            }
            _ => None,
        }
    }

    /// Kernels that write a packed intermediate and cannot scatter to a strided buffer.
    pub const fn requires_unit_stride_output(self) -> bool {
        matches!(
            self,
            Self::KernelStockhamBlockCc | Self::KernelCopyRToCmplx | Self::KernelCopyHermToCmplx
        )
    }

    pub const fn accepts_in_type(self, ty: ArrayType) -> bool {
        match self {
            Self::KernelChirp
            | Self::KernelFftMul
            | Self::KernelResMul
            | Self::KernelCopyCmplxToHerm
            | Self::KernelCopyCmplxToR => matches!(ty, ArrayType::ComplexInterleaved),
            Self::KernelCopyRToCmplx => matches!(ty, ArrayType::Real),
            Self::KernelCopyHermToCmplx => ty.is_hermitian(),
            _ => ty.is_complex(),
        }
    }

    pub const fn accepts_out_type(self, ty: ArrayType) -> bool {
        match self {
            Self::KernelChirp
            | Self::KernelPadMul
            | Self::KernelFftMul
            | Self::KernelCopyRToCmplx
            | Self::KernelCopyHermToCmplx => matches!(ty, ArrayType::ComplexInterleaved),
            Self::KernelCopyCmplxToHerm => ty.is_hermitian(),
            Self::KernelCopyCmplxToR => matches!(ty, ArrayType::Real),
            _ => ty.is_complex(),
        }
    }
}

impl fmt::Display for ComputeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bluestein => "BLUESTEIN",
            Self::L1dCc => "L1D_CC",
            Self::RealViaComplex => "REAL_TRANSFORM_USING_CMPLX",
            Self::KernelStockham => "KERNEL_STOCKHAM",
            Self::KernelStockhamBlockCc => "KERNEL_STOCKHAM_BLOCK_CC",
            Self::KernelStockhamBlockRc => "KERNEL_STOCKHAM_BLOCK_RC",
            Self::KernelChirp => "KERNEL_CHIRP",
            Self::KernelPadMul => "KERNEL_PAD_MUL",
            Self::KernelFftMul => "KERNEL_FFT_MUL",
            Self::KernelResMul => "KERNEL_RES_MUL",
            Self::KernelBluesteinSingle => "KERNEL_BLUESTEIN_SINGLE",
            Self::KernelCopyRToCmplx => "KERNEL_COPY_R_TO_CMPLX",
            Self::KernelCopyCmplxToHerm => "KERNEL_COPY_CMPLX_TO_HERM",
            Self::KernelCopyHermToCmplx => "KERNEL_COPY_HERM_TO_CMPLX",
            Self::KernelCopyCmplxToR => "KERNEL_COPY_CMPLX_TO_R",
        };
        f.write_str(name)
    }
}
