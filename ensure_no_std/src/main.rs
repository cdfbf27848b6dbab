#![no_std]
#![no_main]

use ansamble::{model::UniformModel, DefaultAnsCoder, Multiset};
use core::panic::PanicInfo;

#[global_allocator]
static EMMA: emma::DefaultEmma = emma::DefaultEmma::new();

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    #[allow(clippy::empty_loop)]
    loop {}
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    let model = UniformModel::<u32, 27>::new(10);

    let mut coder = DefaultAnsCoder::new();
    coder.encode_symbol(3usize, &model).unwrap();
    coder.encode_symbol(5usize, &model).unwrap();
    let words = core::hint::black_box(coder.into_words());

    let mut coder = DefaultAnsCoder::from_words(&words).unwrap();
    assert_eq!(coder.decode_symbol(&model), Ok(5));
    assert_eq!(coder.decode_symbol(&model), Ok(3));

    let multiset: Multiset<usize> = [7, 7, 2].into_iter().collect();
    let (symbol, rest) = ansamble::codec::swor::decode(&mut coder, &multiset).unwrap();
    let restored = ansamble::codec::swor::encode(&mut coder, symbol, &rest).unwrap();
    assert_eq!(restored, multiset);

    #[allow(clippy::empty_loop)]
    loop {}
}
