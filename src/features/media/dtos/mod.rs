mod media_dto;

pub use media_dto::{
    DeleteMediaQuery, DeleteMediaResponseDto, GetMediaQuery, MediaErrorContextDto,
    MediaErrorResponseDto, StreamUploadQuery, UploadFileDto, UploadFileResultDto,
};
